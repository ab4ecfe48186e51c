//! Headless controller for the notepin tracker.
//!
//! Owns the live song and its undo history. MIDI imports are committed as a
//! single undoable edit; exports read the current song.

mod undo;

use np_ir::Edit;

// Re-export common types so callers don't need np-ir/np-formats directly.
pub use np_formats::{ExportOptions, FormatError};
pub use np_ir::{analyze, Song, SongFeatures};

pub use undo::UndoStack;

/// Headless tracker controller: owns a song and its edit history.
#[derive(Debug, Default)]
pub struct Controller {
    song: Song,
    undo: UndoStack,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Song management ---

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Apply `edit` and record it for undo.
    pub fn apply(&mut self, edit: Edit) {
        let reverse = self.song.apply(edit.clone());
        self.undo.push(edit, reverse);
    }

    /// Import an SMF file, replacing the song.
    ///
    /// On error the song and history are left untouched.
    pub fn load_midi(&mut self, data: &[u8]) -> Result<(), FormatError> {
        let import = np_formats::import_midi(data)?;
        self.apply(Edit::import(import));
        log::info!(
            "[MIDI] loaded {} bars over {} channels",
            self.song.bar_count,
            self.song.channels.len()
        );
        Ok(())
    }

    pub fn export_midi(&self, options: &ExportOptions) -> Result<Vec<u8>, FormatError> {
        np_formats::export_midi(&self.song, options)
    }

    // --- History ---

    /// Revert the last edit. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.undo.undo() {
            Some(reverse) => {
                self.song.apply(reverse.clone());
                true
            }
            None => false,
        }
    }

    /// Reapply the last undone edit. Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.undo.redo() {
            Some(forward) => {
                self.song.apply(forward.clone());
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }
}
