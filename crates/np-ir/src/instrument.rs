//! Instrument types.

use crate::config::{PAN_CENTER, VOLUME_RANGE};
use crate::presets::Preset;

/// The synthesis model an instrument uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstrumentKind {
    /// Built-in chip waveform (index into the chip wave list)
    Chip { wave: u8 },
    /// User-drawn chip waveform
    CustomChipWave,
    Fm,
    Noise,
    Spectrum,
    Drumset,
    Harmonics,
    Pwm,
    PickedString,
    /// Modulator channel instrument; produces no sound
    Mod,
}

impl InstrumentKind {
    pub fn name(self) -> &'static str {
        match self {
            InstrumentKind::Chip { .. } => "chip",
            InstrumentKind::CustomChipWave => "custom chip",
            InstrumentKind::Fm => "FM",
            InstrumentKind::Noise => "noise",
            InstrumentKind::Spectrum => "spectrum",
            InstrumentKind::Drumset => "drumset",
            InstrumentKind::Harmonics => "harmonics",
            InstrumentKind::Pwm => "PWM",
            InstrumentKind::PickedString => "picked string",
            InstrumentKind::Mod => "mod",
        }
    }
}

/// How simultaneous pitches in a note are voiced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Chord {
    #[default]
    Harmony,
    Strum,
    Arpeggio,
    CustomInterval,
}

impl Chord {
    pub const fn arpeggiates(self) -> bool {
        matches!(self, Chord::Arpeggio | Chord::CustomInterval)
    }

    pub const fn custom_interval(self) -> bool {
        matches!(self, Chord::CustomInterval)
    }
}

/// An instrument on a channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instrument {
    pub kind: InstrumentKind,
    /// Preset this instrument was created from, if any
    pub preset: Option<&'static Preset>,
    /// Attenuation step (0 = loudest, VOLUME_RANGE - 1 = silent)
    pub volume: u32,
    /// 0..=PAN_MAX, PAN_CENTER = centre
    pub pan: u32,
    pub chord: Chord,
    pub fast_two_note_arp: bool,
}

impl Instrument {
    pub fn new(kind: InstrumentKind) -> Self {
        Self {
            kind,
            preset: None,
            volume: 0,
            pan: PAN_CENTER,
            chord: Chord::Harmony,
            fast_two_note_arp: false,
        }
    }

    pub fn from_preset(preset: &'static Preset) -> Self {
        Self {
            preset: Some(preset),
            chord: preset.chord,
            ..Self::new(preset.kind)
        }
    }

    pub fn is_silent(&self) -> bool {
        self.volume >= VOLUME_RANGE - 1
    }
}
