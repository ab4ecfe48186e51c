//! Instrument presets and their General MIDI programs.

use crate::instrument::{Chord, InstrumentKind};

/// A named instrument preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub kind: InstrumentKind,
    pub chord: Chord,
    /// GM program used on export, if the preset has one
    pub midi_program: Option<u8>,
    /// Whether importing this GM program should pick this preset
    pub general_midi: bool,
    /// Belongs on a noise channel
    pub is_noise: bool,
    /// Semitones added to exported MIDI pitches (removed again on import)
    pub midi_subharmonic: Option<i32>,
}

impl Preset {
    pub const fn is_mod(&self) -> bool {
        matches!(self.kind, InstrumentKind::Mod)
    }
}

const fn custom(name: &'static str, kind: InstrumentKind, is_noise: bool) -> Preset {
    Preset {
        name,
        kind,
        chord: Chord::Harmony,
        midi_program: None,
        general_midi: false,
        is_noise,
        midi_subharmonic: None,
    }
}

const fn gm(name: &'static str, kind: InstrumentKind, program: u8) -> Preset {
    Preset {
        name,
        kind,
        chord: Chord::Harmony,
        midi_program: Some(program),
        general_midi: true,
        is_noise: false,
        midi_subharmonic: None,
    }
}

const fn synth(name: &'static str, kind: InstrumentKind, program: u8) -> Preset {
    Preset { general_midi: false, ..gm(name, kind, program) }
}

const fn drum(name: &'static str, program: u8, general_midi: bool, subharmonic: i32) -> Preset {
    Preset {
        name,
        kind: InstrumentKind::Spectrum,
        chord: Chord::Strum,
        midi_program: Some(program),
        general_midi,
        is_noise: true,
        midi_subharmonic: Some(subharmonic),
    }
}

use InstrumentKind::*;

pub static PRESETS: &[Preset] = &[
    // Custom instruments
    custom("chip wave", Chip { wave: 0 }, false),
    custom("FM (expert)", Fm, false),
    custom("basic noise", Noise, true),
    custom("spectrum", Spectrum, false),
    custom("drumset", Drumset, true),
    custom("harmonics", Harmonics, false),
    custom("pulse width", Pwm, false),
    custom("picked string", PickedString, false),
    custom("modulator", Mod, false),
    // Retro
    Preset { chord: Chord::Arpeggio, ..synth("chip noise", Noise, 116) },
    Preset { is_noise: true, ..synth("standard drumset", Drumset, 116) },
    synth("square lead", Chip { wave: 2 }, 80),
    synth("sawtooth lead", Chip { wave: 5 }, 81),
    // Keyboards
    gm("grand piano", Fm, 0),
    gm("bright piano", Fm, 1),
    gm("electric piano", Fm, 4),
    gm("harpsichord", Fm, 6),
    gm("clavinet", Fm, 7),
    // Idiophones
    gm("celesta", Fm, 8),
    gm("glockenspiel", Fm, 9),
    gm("music box", Fm, 10),
    gm("vibraphone", Fm, 11),
    gm("marimba", Fm, 12),
    gm("xylophone", Fm, 13),
    gm("tubular bell", Fm, 14),
    // Organs
    gm("drawbar organ", Harmonics, 16),
    gm("rock organ", Harmonics, 18),
    gm("church organ", Harmonics, 19),
    gm("accordion", Harmonics, 21),
    // Guitars and basses
    gm("nylon guitar", PickedString, 24),
    gm("steel guitar", PickedString, 25),
    gm("jazz guitar", PickedString, 26),
    gm("clean guitar", PickedString, 27),
    gm("overdrive guitar", Fm, 29),
    gm("distortion guitar", Fm, 30),
    gm("acoustic bass", PickedString, 32),
    gm("fingered bass", PickedString, 33),
    gm("slap bass", Fm, 36),
    gm("synth bass", Fm, 38),
    // Strings
    gm("violin", Fm, 40),
    gm("viola", Fm, 41),
    gm("cello", Fm, 42),
    gm("contrabass", Fm, 43),
    gm("pizzicato strings", PickedString, 45),
    gm("harp", PickedString, 46),
    gm("timpani", Spectrum, 47),
    synth("dark strike", Spectrum, 47),
    gm("strings", Harmonics, 48),
    gm("choir", Harmonics, 52),
    // Brass
    gm("trumpet", Fm, 56),
    gm("trombone", Fm, 57),
    gm("tuba", Fm, 58),
    gm("muted trumpet", Fm, 59),
    gm("french horn", Fm, 60),
    gm("brass section", Fm, 61),
    gm("brass synth 1", Fm, 62),
    gm("brass synth 2", Fm, 63),
    synth("pulse brass", Pwm, 62),
    // Reeds and pipes
    gm("soprano sax", Fm, 64),
    gm("alto sax", Fm, 65),
    gm("tenor sax", Fm, 66),
    gm("baritone sax", Fm, 67),
    gm("oboe", Fm, 68),
    gm("bassoon", Fm, 70),
    gm("clarinet", Fm, 71),
    gm("piccolo", Fm, 72),
    gm("flute", Fm, 73),
    gm("recorder", Fm, 74),
    gm("pan flute", Spectrum, 75),
    gm("ocarina", Fm, 79),
    // Pads
    gm("warm pad", Harmonics, 89),
    // Ethnic
    gm("sitar", PickedString, 104),
    gm("banjo", PickedString, 105),
    gm("koto", PickedString, 107),
    // Percussion
    gm("steel pan", Fm, 114),
    synth("steel pan synth", Fm, 114),
    drum("woodblock", 115, true, -30),
    drum("taiko drum", 116, true, -6),
    drum("melodic drum", 117, true, -18),
    drum("drum synth", 118, true, -24),
    drum("tom-tom", 116, false, -12),
    drum("metal pipe", 117, false, -18),
    synth("synth kick", Fm, 47),
];

/// The first General MIDI preset using `program`.
pub fn midi_program_to_preset(program: u8) -> Option<&'static Preset> {
    PRESETS
        .iter()
        .find(|p| p.general_midi && p.midi_program == Some(program))
}

pub fn preset_by_name(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name)
}
