//! Standard MIDI File support for the notepin tracker.
//!
//! Exports a song as a format 1 SMF and imports SMF files of any format
//! back into channels, patterns and pin envelopes.

mod byte_reader;
mod byte_writer;
pub mod midi;
mod midi_export;
mod midi_import;

pub use byte_reader::ByteReader;
pub use byte_writer::ByteWriter;
pub use midi_export::{export_midi, ExportOptions};
pub use midi_import::{compact_channels, import_midi, reconstruct_pins, EnvelopeSample};

use thiserror::Error;

/// Error type for MIDI parsing and writing.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A read or rewrite past the end of the data
    #[error("out of range: {wanted} bytes at offset {offset} of {len}")]
    OutOfRange { offset: usize, wanted: usize, len: usize },
    #[error("no header chunk found")]
    MissingHeader,
    #[error("invalid header chunk: {0}")]
    InvalidHeader(#[from] binrw::Error),
    #[error("unrecognized event status {0:#04x}")]
    UnrecognizedEventStatus(u8),
    #[error("value {0:#x} does not fit in 7 bits")]
    SevenBitOverflow(u32),
    #[error("value {0:#x} too large for a variable-length quantity")]
    VariableLengthOverflow(u32),
    #[error("text is not ASCII: {0:?}")]
    NonAscii(String),
    #[error("event time went backwards from {prev} to {time}")]
    TimeWentBackwards { prev: u32, time: u32 },
    #[error("control value {0} out of range")]
    ControlValueOutOfRange(i64),
    #[error("{0} instruments cannot be exported")]
    UnsupportedInstrument(&'static str),
    #[error("channel {channel} has no instrument {index}")]
    MissingInstrument { channel: usize, index: usize },
    #[error("no drum for drumset pitch {0}")]
    UnknownDrumPitch(i32),
    #[error("marker track covers {marked} ticks, expected {expected}")]
    BarCountMismatch { marked: u32, expected: u32 },
    #[error("malformed note at part {0}")]
    MalformedNote(u32),
}
