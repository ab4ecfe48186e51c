//! Pin envelope reconstruction from per-part pitch and volume samples.
//!
//! A sample becomes a candidate pin when it lands on or crosses an integer.
//! Each time a new candidate arrives, the candidate since the last placed pin
//! that strays furthest from the straight line between that pin and the new
//! candidate is promoted to a pin. Pitch and volume are judged separately and
//! the earlier of the two corners wins.

use np_ir::config::NOTE_VOLUME_MAX;
use np_ir::NotePin;

/// Pitch (in channel pitch units) and pin volume at one part.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeSample {
    pub pitch: f64,
    pub volume: f64,
}

#[derive(Clone, Copy, Debug)]
struct PotentialPin {
    part: u32,
    pitch: i32,
    volume: i32,
    key_pitch: bool,
    key_volume: bool,
}

const NEAR_INTEGER: f64 = 0.01;

fn near_integer(value: f64) -> bool {
    (value - value.round()).abs() < NEAR_INTEGER
}

/// Whether moving from `prev` to `value` lands on or crosses an integer.
fn is_key_point(prev: f64, value: f64) -> bool {
    let crossed = if near_integer(prev) {
        (value - prev).abs() >= 1.0
    } else {
        value.floor() != prev.floor()
    };
    near_integer(value) || crossed
}

/// Index of the key candidate after `anchor` furthest from the line between
/// `anchor` and `current`, if any strays further than the line's slope.
fn furthest_deviation(
    potential: &[PotentialPin],
    anchor: usize,
    current: &PotentialPin,
    is_key: impl Fn(&PotentialPin) -> bool,
    value: impl Fn(&PotentialPin) -> i32,
) -> Option<usize> {
    let start = &potential[anchor];
    let slope = f64::from(value(current) - value(start)) / f64::from(current.part - start.part);
    let mut furthest = slope.abs();
    let mut found = None;
    for (index, candidate) in potential.iter().enumerate().skip(anchor + 1) {
        if !is_key(candidate) {
            continue;
        }
        let interpolated = f64::from(value(start)) + slope * f64::from(candidate.part - start.part);
        let distance = (interpolated - f64::from(value(candidate))).abs();
        if furthest < distance {
            furthest = distance;
            found = Some(index);
        }
    }
    found
}

fn pitch_corner(potential: &[PotentialPin], anchor: usize, current: &PotentialPin) -> Option<usize> {
    furthest_deviation(potential, anchor, current, |p| p.key_pitch, |p| p.pitch)
}

fn volume_corner(potential: &[PotentialPin], anchor: usize, current: &PotentialPin) -> Option<usize> {
    furthest_deviation(potential, anchor, current, |p| p.key_volume, |p| p.volume)
}

fn pin_volume(volume: i32) -> u32 {
    volume.clamp(0, NOTE_VOLUME_MAX as i32) as u32
}

/// Build the pins of a note from its start sample and one sample per part.
///
/// `samples[i]` is the envelope at part `i + 1` from the note start, so the
/// note is `samples.len()` parts long. Pin intervals are relative to the
/// rounded start pitch. `samples` must not be empty.
pub fn reconstruct_pins(start: EnvelopeSample, samples: &[EnvelopeSample]) -> Vec<NotePin> {
    let start_pitch = start.pitch.round() as i32;
    let start_volume = start.volume.round() as i32;
    let mut pins = vec![NotePin::new(0, 0, pin_volume(start_volume))];
    let mut potential = vec![PotentialPin {
        part: 0,
        pitch: start_pitch,
        volume: start_volume,
        key_pitch: false,
        key_volume: false,
    }];
    let mut prev_pin_index = 0;
    let mut prev = start;

    for (i, sample) in samples.iter().enumerate() {
        let is_last = i + 1 == samples.len();
        let key_pitch = is_key_point(prev.pitch, sample.pitch) || is_last;
        let key_volume = is_key_point(prev.volume, sample.volume) || is_last;
        prev = *sample;
        if !key_pitch && !key_volume {
            continue;
        }

        let current = PotentialPin {
            part: i as u32 + 1,
            pitch: sample.pitch.round() as i32,
            volume: sample.volume.round() as i32,
            key_pitch,
            key_volume,
        };
        let pitch = key_pitch.then(|| pitch_corner(&potential, prev_pin_index, &current)).flatten();
        let volume = key_volume.then(|| volume_corner(&potential, prev_pin_index, &current)).flatten();
        let corner = match (pitch, volume) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if let Some(index) = corner {
            let pin = potential[index];
            pins.push(NotePin::new(pin.pitch - start_pitch, pin.part, pin_volume(pin.volume)));
            prev_pin_index = index;
        }
        potential.push(current);
    }

    if let Some(last) = potential.last().filter(|p| p.part > 0) {
        pins.push(NotePin::new(last.pitch - start_pitch, last.part, pin_volume(last.volume)));
    }
    pins
}
