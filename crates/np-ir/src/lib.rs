//! Core song model for the notepin tracker.
//!
//! Channels hold patterns of notes whose pitch and volume follow
//! piecewise-linear pin envelopes. The MIDI import and export engines
//! produce and consume these types.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod analysis;
pub mod config;
mod edit;
mod instrument;
mod pattern;
pub mod presets;
mod song;
pub mod volume;

pub use analysis::{analyze, SongFeatures};
pub use edit::Edit;
pub use instrument::{Chord, Instrument, InstrumentKind};
pub use pattern::{Note, NotePin, Pattern};
pub use presets::{midi_program_to_preset, preset_by_name, Preset};
pub use song::{remove_duplicate_patterns, Channel, Song, SongImport};
