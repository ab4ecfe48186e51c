//! Standard MIDI File constants and tables shared by import and export.

use binrw::io::Cursor;
use binrw::BinRead;

use crate::FormatError;

pub const DEFAULT_MIDI_EXPRESSION: u32 = 0x7F;
pub const DEFAULT_MIDI_PITCH_BEND: u32 = 0x2000;

// --- Chunks ---

/// "MThd"
pub const CHUNK_HEADER: u32 = 0x4D54_6864;
/// "MTrk"
pub const CHUNK_TRACK: u32 = 0x4D54_726B;
pub const HEADER_LENGTH: u32 = 6;

pub const FORMAT_SINGLE_TRACK: u16 = 0;
pub const FORMAT_SIMULTANEOUS_TRACKS: u16 = 1;
pub const FORMAT_INDEPENDENT_TRACKS: u16 = 2;

// --- Event types (high nibble; low nibble is the channel) ---

pub const EVENT_NOTE_OFF: u8 = 0x80;
pub const EVENT_NOTE_ON: u8 = 0x90;
pub const EVENT_KEY_PRESSURE: u8 = 0xA0;
pub const EVENT_CONTROL_CHANGE: u8 = 0xB0;
pub const EVENT_PROGRAM_CHANGE: u8 = 0xC0;
pub const EVENT_CHANNEL_PRESSURE: u8 = 0xD0;
pub const EVENT_PITCH_BEND: u8 = 0xE0;
pub const EVENT_META_AND_SYSEX: u8 = 0xF0;

// Identified by all 8 bits
pub const EVENT_META: u8 = 0xFF;
pub const EVENT_SYSEX_START: u8 = 0xF0;
pub const EVENT_SYSEX_ESCAPE: u8 = 0xF7;

// --- Control change messages ---

pub const CC_SET_PARAMETER_MSB: u8 = 0x06;
pub const CC_VOLUME_MSB: u8 = 0x07;
pub const CC_PAN_MSB: u8 = 0x0A;
pub const CC_EXPRESSION_MSB: u8 = 0x0B;
pub const CC_SET_PARAMETER_LSB: u8 = 0x26;
pub const CC_RPN_LSB: u8 = 0x64;
pub const CC_RPN_MSB: u8 = 0x65;

/// Registered parameter (MSB, LSB) selecting the pitch bend range.
pub const RPN_PITCH_BEND_RANGE: (u8, u8) = (0x00, 0x00);
/// Registered parameter (MSB, LSB) that deselects any parameter.
pub const RPN_RESET: (u8, u8) = (0x7F, 0x7F);

// --- Meta messages ---

pub const META_TEXT: u8 = 0x01;
pub const META_TRACK_NAME: u8 = 0x03;
pub const META_INSTRUMENT_NAME: u8 = 0x04;
pub const META_MARKER: u8 = 0x06;
pub const META_END_OF_TRACK: u8 = 0x2F;
pub const META_TEMPO: u8 = 0x51;
pub const META_TIME_SIGNATURE: u8 = 0x58;
pub const META_KEY_SIGNATURE: u8 = 0x59;

/// Body of the "MThd" chunk.
#[derive(BinRead, Clone, Copy, Debug, PartialEq, Eq)]
#[br(big)]
pub struct MidiHeader {
    pub format: u16,
    pub track_count: u16,
    pub ticks_per_beat: u16,
}

impl MidiHeader {
    pub fn parse(body: &[u8]) -> Result<Self, FormatError> {
        Ok(Self::read(&mut Cursor::new(body))?)
    }
}

// --- Drums ---

/// How a General MIDI percussion key maps onto a noise channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalogousDrum {
    /// Noise pitch, `0..DRUM_COUNT`
    pub frequency: i32,
    /// Length bucket; notes last `duration * 6` parts
    pub duration: u32,
    /// Pin volume
    pub volume: u32,
}

const fn drum(frequency: i32, duration: u32, volume: u32) -> Option<AnalogousDrum> {
    Some(AnalogousDrum { frequency, duration, volume })
}

/// The noise-channel analogue of a GM percussion key, if it has one.
pub fn analogous_drum(key: u8) -> Option<AnalogousDrum> {
    match key {
        35 | 36 => drum(0, 2, 3), // bass drums
        37 => drum(5, 1, 3),      // side stick
        38 | 40 => drum(4, 2, 3), // snares
        39 => drum(5, 2, 3),      // hand clap
        41 | 43 => drum(1, 2, 3), // floor toms
        42 => drum(8, 1, 3),      // closed hi-hat
        44 => drum(8, 1, 2),      // pedal hi-hat
        45 | 47 => drum(2, 2, 3), // low toms
        46 => drum(8, 4, 3),      // open hi-hat
        48 | 50 => drum(3, 2, 3), // high toms
        49 | 52 | 57 => drum(7, 4, 3), // crash and china cymbals
        51 => drum(6, 4, 2), // ride cymbal 1
        53 => drum(6, 2, 3), // ride bell
        54 => drum(11, 2, 3), // tambourine
        55 => drum(9, 4, 3), // splash cymbal
        56 => drum(7, 1, 2), // cowbell
        58 => drum(10, 2, 2), // vibraslap
        59 => drum(6, 4, 3), // ride cymbal 2
        69 | 70 => drum(10, 2, 3), // cabasa, maracas
        73 => drum(10, 1, 2), // short guiro
        74 => drum(10, 2, 2), // long guiro
        _ => None,
    }
}

/// GM percussion key exported for each drumset pitch.
pub const DRUMSET_EXPORT_MAP: [u8; 12] = [
    36, // bass drum 1
    41, // low floor tom
    45, // low tom
    48, // hi-mid tom
    40, // electric snare
    39, // hand clap
    59, // ride cymbal 2
    49, // crash cymbal 1
    46, // open hi-hat
    55, // splash cymbal
    69, // cabasa
    54, // tambourine
];

// --- Programs ---

/// GM program for each built-in chip wave.
pub const CHIP_WAVE_PROGRAMS: [u8; 9] = [0x4A, 0x47, 0x50, 0x46, 0x44, 0x51, 0x51, 0x51, 0x51];

pub const PROGRAM_STEEL_GUITAR: u8 = 0x19;
pub const PROGRAM_PAN_FLUTE: u8 = 75;
pub const PROGRAM_SAWTOOTH: u8 = 81;
pub const PROGRAM_TAIKO: u8 = 116;
