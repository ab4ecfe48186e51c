//! Edit commands for mutating song data.

use alloc::boxed::Box;
use core::mem;

use crate::song::{Song, SongImport};

/// An edit command that mutates song data.
#[derive(Clone, Debug, PartialEq)]
pub enum Edit {
    /// Replace the whole song.
    ReplaceSong(Box<Song>),
}

impl Edit {
    /// The edit that commits an imported channel set.
    pub fn import(import: SongImport) -> Self {
        Edit::ReplaceSong(Box::new(Song::from_import(import)))
    }
}

impl Song {
    /// Apply `edit` and return the edit that reverts it.
    pub fn apply(&mut self, edit: Edit) -> Edit {
        match edit {
            Edit::ReplaceSong(song) => Edit::ReplaceSong(Box::new(mem::replace(self, *song))),
        }
    }
}
