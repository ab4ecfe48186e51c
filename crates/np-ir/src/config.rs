//! Fixed song-model constants.
//!
//! Everything here is a compile-time constant shared by the editor model,
//! the MIDI import/export engines and the volume curves.

/// Smallest time subdivision of a beat.
pub const PARTS_PER_BEAT: u32 = 24;
/// Synth ticks per part.
pub const TICKS_PER_PART: u32 = 2;
/// Synth ticks spent on each arpeggio step.
pub const TICKS_PER_ARPEGGIO: u32 = 3;

pub const BEATS_PER_BAR_MIN: u32 = 3;
pub const BEATS_PER_BAR_MAX: u32 = 16;
pub const TEMPO_MIN: u32 = 30;
pub const TEMPO_MAX: u32 = 300;

/// Maximum number of simultaneous pitches in one note.
pub const MAX_CHORD_SIZE: usize = 4;
/// FM operators, which is also the FM voice count for custom-interval chords.
pub const OPERATOR_COUNT: usize = 4;

/// Pin volumes range over `0..=NOTE_VOLUME_MAX`.
pub const NOTE_VOLUME_MAX: u32 = 3;

/// Instrument volume is an attenuation in `0..VOLUME_RANGE`; the last step is silence.
pub const VOLUME_RANGE: u32 = 8;
/// Each attenuation step multiplies the volume by `2^VOLUME_LOG_SCALE`.
pub const VOLUME_LOG_SCALE: f64 = -0.5;
pub const PAN_CENTER: u32 = 4;
pub const PAN_MAX: u32 = PAN_CENTER * 2;

/// MIDI pitch of noise pitch 0.
pub const SPECTRUM_BASE_PITCH: i32 = 24;
/// Semitones between adjacent noise pitches.
pub const NOISE_INTERVAL: i32 = 6;
pub const DRUM_COUNT: i32 = 12;

pub const PITCHES_PER_OCTAVE: i32 = 12;
pub const PITCH_OCTAVES: i32 = 7;
pub const WINDOW_OCTAVES: i32 = 3;
pub const SCROLLABLE_OCTAVES: i32 = PITCH_OCTAVES - WINDOW_OCTAVES;
pub const MAX_PITCH: i32 = PITCH_OCTAVES * PITCHES_PER_OCTAVE;

pub const PITCH_CHANNEL_COUNT_MAX: usize = 6;
pub const NOISE_CHANNEL_COUNT_MAX: usize = 3;
pub const MOD_CHANNEL_COUNT_MAX: usize = 8;

/// Longest song, in bars. Also caps the patterns per channel.
pub const BAR_COUNT_MAX: usize = 128;
pub const INSTRUMENTS_PER_CHANNEL_MAX: usize = 10;

/// A musical key: its display name and the MIDI pitch of pitch 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Key {
    pub name: &'static str,
    pub base_pitch: i32,
}

pub const KEYS: [Key; 12] = [
    Key { name: "C", base_pitch: 12 },
    Key { name: "C#", base_pitch: 13 },
    Key { name: "D", base_pitch: 14 },
    Key { name: "D#", base_pitch: 15 },
    Key { name: "E", base_pitch: 16 },
    Key { name: "F", base_pitch: 17 },
    Key { name: "F#", base_pitch: 18 },
    Key { name: "G", base_pitch: 19 },
    Key { name: "G#", base_pitch: 20 },
    Key { name: "A", base_pitch: 21 },
    Key { name: "A#", base_pitch: 22 },
    Key { name: "B", base_pitch: 23 },
];

/// A scale: which of the 12 semitones above the key are in use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scale {
    pub name: &'static str,
    pub flags: [bool; 12],
}

impl Scale {
    /// A minor third without a major third.
    pub fn is_minor(&self) -> bool {
        self.flags[3] && !self.flags[4]
    }
}

const T: bool = true;
const F: bool = false;

pub const SCALES: [Scale; 12] = [
    Scale { name: "pentatonic major", flags: [T, F, T, F, T, F, F, T, F, T, F, F] },
    Scale { name: "pentatonic minor", flags: [T, F, F, T, F, T, F, T, F, F, T, F] },
    Scale { name: "ryukyu", flags: [T, F, F, F, T, T, F, T, F, F, F, T] },
    Scale { name: "pelog selisir", flags: [T, T, F, T, F, F, F, T, T, F, F, F] },
    Scale { name: "blues major", flags: [T, F, T, T, T, F, F, T, F, T, F, F] },
    Scale { name: "blues", flags: [T, F, F, T, F, T, T, T, F, F, T, F] },
    Scale { name: "ionian", flags: [T, F, T, F, T, T, F, T, F, T, F, T] },
    Scale { name: "aeolian", flags: [T, F, T, T, F, T, F, T, T, F, T, F] },
    Scale { name: "double harmonic major", flags: [T, T, F, F, T, T, F, T, T, F, F, T] },
    Scale { name: "double harmonic minor", flags: [T, F, T, T, F, F, T, T, T, F, F, T] },
    Scale { name: "whole tone", flags: [T, F, T, F, T, F, T, F, T, F, T, F] },
    Scale { name: "chromatic", flags: [T; 12] },
];

/// Index of the chromatic scale, used for imported songs.
pub const CHROMATIC_SCALE: usize = 11;

/// Pick which of `pitch_count` pitches sounds on arpeggio step `arpeggio`.
pub fn arpeggio_pitch_index(pitch_count: usize, fast_two_note_arp: bool, arpeggio: usize) -> usize {
    let pattern: &[usize] = match pitch_count {
        0 | 1 => return 0,
        2 if fast_two_note_arp => &[0, 1],
        2 => &[0, 0, 1, 1],
        3 => &[0, 1, 2, 1],
        4 => &[0, 1, 2, 3],
        _ => return arpeggio % pitch_count,
    };
    pattern[arpeggio % pattern.len()]
}
