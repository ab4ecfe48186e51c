//! Volume curves between the song model and MIDI controller values.
//!
//! Everything converts through a linear "volume multiplier". MIDI volume
//! (CC 7) treats the default controller value 100 as a multiplier of 1.0.

use crate::config::{NOTE_VOLUME_MAX, VOLUME_LOG_SCALE, VOLUME_RANGE};

/// `(100 / 127)^4`, the multiplier of the default MIDI volume.
const MIDI_DEFAULT_VOLUME_MULT: f64 = 0.384_401_537_604_612_8;

pub fn midi_volume_to_volume_mult(volume: f64) -> f64 {
    libm::pow(volume / 127.0, 4.0) / MIDI_DEFAULT_VOLUME_MULT
}

pub fn volume_mult_to_midi_volume(volume_mult: f64) -> f64 {
    libm::pow(volume_mult * MIDI_DEFAULT_VOLUME_MULT, 0.25) * 127.0
}

pub fn midi_expression_to_volume_mult(expression: f64) -> f64 {
    libm::pow(expression / 127.0, 4.0)
}

pub fn volume_mult_to_midi_expression(volume_mult: f64) -> f64 {
    libm::pow(volume_mult, 0.25) * 127.0
}

/// Instrument attenuation step to multiplier. The last step is silence.
pub fn instrument_volume_to_volume_mult(volume: u32) -> f64 {
    if volume == VOLUME_RANGE - 1 {
        0.0
    } else {
        libm::pow(2.0, VOLUME_LOG_SCALE * f64::from(volume))
    }
}

/// Multiplier to a (fractional) attenuation step, capped below silence
/// unless the multiplier is zero.
pub fn volume_mult_to_instrument_volume(volume_mult: f64) -> f64 {
    if volume_mult <= 0.0 {
        f64::from(VOLUME_RANGE - 1)
    } else {
        let steps = libm::log2(volume_mult) / VOLUME_LOG_SCALE;
        steps.min(f64::from(VOLUME_RANGE - 2))
    }
}

/// Note pin volume (`0..=NOTE_VOLUME_MAX`, fractional while interpolating) to multiplier.
pub fn expression_to_volume_mult(expression: f64) -> f64 {
    libm::pow(expression.max(0.0) / f64::from(NOTE_VOLUME_MAX), 1.5)
}

pub fn volume_mult_to_expression(volume_mult: f64) -> f64 {
    libm::pow(volume_mult.max(0.0), 1.0 / 1.5) * f64::from(NOTE_VOLUME_MAX)
}
