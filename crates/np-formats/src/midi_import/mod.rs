//! Standard MIDI File import.
//!
//! Import runs in three passes: [`parse`] simulates the file's tracks into
//! per-MIDI-channel event timelines, [`translate`] rebuilds those as tracker
//! channels with pin envelopes, and [`compact_channels`] merges channels
//! until each channel group fits its cap.

mod compact;
mod parse;
mod pins;
mod translate;

pub use compact::compact_channels;
pub use pins::{reconstruct_pins, EnvelopeSample};

use np_ir::config::{MOD_CHANNEL_COUNT_MAX, NOISE_CHANNEL_COUNT_MAX, PITCH_CHANNEL_COUNT_MAX};
use np_ir::SongImport;

use crate::FormatError;

/// Import an SMF file.
///
/// Nothing is returned unless the whole file parses; the result is ready to
/// be committed to a song as a single edit.
pub fn import_midi(data: &[u8]) -> Result<SongImport, FormatError> {
    let timeline = parse::parse_midi(data)?;
    let mut import = translate::translate(&timeline);

    compact_channels(&mut import.pitch_channels, PITCH_CHANNEL_COUNT_MAX);
    compact_channels(&mut import.noise_channels, NOISE_CHANNEL_COUNT_MAX);
    compact_channels(&mut import.mod_channels, MOD_CHANNEL_COUNT_MAX);

    log::info!(
        "[MIDI] imported {} pitch, {} noise, {} mod channels at {} bpm",
        import.pitch_channels.len(),
        import.noise_channels.len(),
        import.mod_channels.len(),
        import.tempo
    );
    Ok(import)
}
