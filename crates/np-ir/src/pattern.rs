//! Notes, pins and patterns.

use alloc::vec;
use alloc::vec::Vec;
use arrayvec::ArrayVec;

use crate::config::MAX_CHORD_SIZE;

/// A control point of a note's envelope.
///
/// `time` is in parts from the note start, `interval` is the pitch offset from
/// the note's pitches, and `volume` is in `0..=NOTE_VOLUME_MAX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotePin {
    pub interval: i32,
    pub time: u32,
    pub volume: u32,
}

impl NotePin {
    pub const fn new(interval: i32, time: u32, volume: u32) -> Self {
        Self { interval, time, volume }
    }
}

/// A note: one or more simultaneous pitches sharing a pin envelope.
///
/// Pins are ordered by strictly increasing time, the first pin sits at time 0
/// with interval 0, and there are always at least two.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    /// Pitches relative to the channel base pitch
    pub pitches: ArrayVec<i32, MAX_CHORD_SIZE>,
    pub pins: Vec<NotePin>,
    /// Start in parts from the bar start
    pub start: u32,
    /// End in parts from the bar start
    pub end: u32,
}

impl Note {
    /// A flat note. With `fadeout` the volume ramps down to zero at the end.
    pub fn new(pitch: i32, start: u32, end: u32, volume: u32, fadeout: bool) -> Self {
        let mut pitches = ArrayVec::new();
        pitches.push(pitch);
        Self {
            pitches,
            pins: vec![
                NotePin::new(0, 0, volume),
                NotePin::new(0, end - start, if fadeout { 0 } else { volume }),
            ],
            start,
            end,
        }
    }

    /// The interval the note spends the most time on.
    ///
    /// Longest flat stretch between consecutive pins wins; without any flat
    /// stretch the loudest pin's interval is used.
    pub fn pick_main_interval(&self) -> i32 {
        let mut longest_flat_duration = 0;
        let mut main_interval = 0;
        for pair in self.pins.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.interval == b.interval {
                let duration = b.time - a.time;
                if longest_flat_duration < duration {
                    longest_flat_duration = duration;
                    main_interval = a.interval;
                }
            }
        }
        if longest_flat_duration == 0 {
            let mut loudest_volume = 0;
            for pin in &self.pins {
                if loudest_volume < pin.volume {
                    loudest_volume = pin.volume;
                    main_interval = pin.interval;
                }
            }
        }
        main_interval
    }

    /// Linearly interpolated interval at `time` parts from the note start.
    pub fn interval_at(&self, time: f64) -> f64 {
        let Some(first) = self.pins.first() else {
            return 0.0;
        };
        let mut prev = *first;
        for pin in &self.pins[1..] {
            if f64::from(pin.time) >= time {
                let span = f64::from(pin.time - prev.time);
                if span <= 0.0 {
                    return f64::from(pin.interval);
                }
                let t = (time - f64::from(prev.time)) / span;
                return f64::from(prev.interval) + t * f64::from(pin.interval - prev.interval);
            }
            prev = *pin;
        }
        f64::from(prev.interval)
    }
}

/// A bar's worth of notes for one channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pattern {
    pub notes: Vec<Note>,
    /// Index into the channel's instrument list
    pub instrument: usize,
}

impl Pattern {
    pub fn new(instrument: usize) -> Self {
        Self { notes: Vec::new(), instrument }
    }
}
