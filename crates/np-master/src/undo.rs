//! Undo/redo stack for song edits.

use np_ir::Edit;

/// A single undoable operation: forward edit + reverse edit.
#[derive(Clone, Debug)]
struct UndoEntry {
    forward: Edit,
    reverse: Edit,
}

/// Undo/redo stack.
#[derive(Debug, Default)]
pub struct UndoStack {
    entries: Vec<UndoEntry>,
    position: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an applied edit with its reverse.
    pub fn push(&mut self, forward: Edit, reverse: Edit) {
        // Anything past the current position can no longer be redone
        self.entries.truncate(self.position);
        self.entries.push(UndoEntry { forward, reverse });
        self.position = self.entries.len();
    }

    /// Step back: returns the reverse edit to apply, or None if nothing to undo.
    pub fn undo(&mut self) -> Option<&Edit> {
        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        Some(&self.entries[self.position].reverse)
    }

    /// Step forward: returns the forward edit to apply, or None if nothing to redo.
    pub fn redo(&mut self) -> Option<&Edit> {
        let entry = self.entries.get(self.position)?;
        self.position += 1;
        Some(&entry.forward)
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.position < self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use np_ir::Song;

    fn song_at(tempo: u32) -> Edit {
        let mut song = Song::default();
        song.tempo = tempo;
        Edit::ReplaceSong(Box::new(song))
    }

    #[test]
    fn undo_redo_single() {
        let mut stack = UndoStack::new();
        stack.push(song_at(90), song_at(150));

        assert!(stack.can_undo());
        assert_eq!(stack.undo(), Some(&song_at(150)));
        assert!(stack.can_redo());
        assert_eq!(stack.redo(), Some(&song_at(90)));
        assert!(!stack.can_redo());
    }

    #[test]
    fn undo_at_bottom_returns_none() {
        let mut stack = UndoStack::new();
        assert!(stack.undo().is_none());
    }

    #[test]
    fn redo_at_top_returns_none() {
        let mut stack = UndoStack::new();
        assert!(stack.redo().is_none());
    }

    #[test]
    fn new_edit_after_undo_truncates_redo() {
        let mut stack = UndoStack::new();
        stack.push(song_at(90), song_at(150));
        stack.push(song_at(120), song_at(90));

        stack.undo();
        assert!(stack.can_redo());

        stack.push(song_at(60), song_at(90));
        assert!(!stack.can_redo());
        assert_eq!(stack.undo(), Some(&song_at(90)));
        assert_eq!(stack.undo(), Some(&song_at(150)));
        assert!(stack.undo().is_none());
    }
}
