//! notepin CLI: inspect and re-export Standard MIDI Files.
//!
//! Usage:
//!   np-cli info path/to/file.mid
//!   np-cli convert path/to/file.mid -o out.mid --loops 2 --no-outro

use clap::{Parser, Subcommand};
use np_master::{Controller, ExportOptions};
use std::path::{Path, PathBuf};
use std::{fs, process};

#[derive(Parser)]
#[command(name = "np-cli", version, about = "Import and export MIDI files through the notepin song model")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a MIDI file and print what it contains
    Info {
        /// Standard MIDI File to read
        input: PathBuf,
    },
    /// Import a MIDI file and export it again
    Convert {
        /// Standard MIDI File to read
        input: PathBuf,

        /// Where to write the exported file
        #[arg(short, long)]
        output: PathBuf,

        /// Times to play the loop
        #[arg(long, default_value_t = 1)]
        loops: usize,

        /// Leave out the bars before the loop
        #[arg(long)]
        no_intro: bool,

        /// Leave out the bars after the loop
        #[arg(long)]
        no_outro: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Info { input } => {
            let ctrl = load(&input);
            print!("{}", np_master::analyze(ctrl.song()));
        }
        Command::Convert { input, output, loops, no_intro, no_outro } => {
            let ctrl = load(&input);
            let options = ExportOptions {
                include_intro: !no_intro,
                include_outro: !no_outro,
                loop_count: loops,
            };
            let bytes = ctrl.export_midi(&options).unwrap_or_else(|e| {
                eprintln!("Failed to export {}: {}", input.display(), e);
                process::exit(1);
            });
            fs::write(&output, &bytes).unwrap_or_else(|e| {
                eprintln!("Failed to write {}: {}", output.display(), e);
                process::exit(1);
            });
            println!("Wrote {} bytes to {}", bytes.len(), output.display());
        }
    }
}

fn load(path: &Path) -> Controller {
    let data = fs::read(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", path.display(), e);
        process::exit(1);
    });

    let mut ctrl = Controller::new();
    ctrl.load_midi(&data).unwrap_or_else(|e| {
        eprintln!("Failed to parse MIDI: {}", e);
        process::exit(1);
    });
    log::debug!("loaded {}", path.display());
    ctrl
}
