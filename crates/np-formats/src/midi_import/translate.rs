//! Turn simulated MIDI channel timelines into tracker channels.

use arrayvec::ArrayVec;
use np_ir::config::{
    DRUM_COUNT, KEYS, MAX_CHORD_SIZE, MAX_PITCH, NOISE_INTERVAL, PARTS_PER_BEAT, PAN_CENTER, PITCHES_PER_OCTAVE,
    SCROLLABLE_OCTAVES, SPECTRUM_BASE_PITCH, TEMPO_MAX, TEMPO_MIN,
};
use np_ir::{
    midi_program_to_preset, preset_by_name, Channel, Instrument, InstrumentKind, Note, Pattern, Preset,
    SongImport,
};

use super::parse::{ExpressionEvent, MidiChannelState, MidiTimeline, NoteEvent, PitchBendEvent};
use super::pins::{reconstruct_pins, EnvelopeSample};
use crate::midi::analogous_drum;

const DRUMSET_MIDI_CHANNEL: usize = 9;
const DRUMSET_PRESET: &str = "standard drumset";
const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;

// ---------------------------------------------------------------------------
// Song-level timing
// ---------------------------------------------------------------------------

/// Tick and part arithmetic shared by every channel of one file.
#[derive(Clone, Copy, Debug)]
struct Timing {
    ticks_per_beat: u64,
    ticks_per_part: f64,
    beats_per_bar: u32,
    parts_per_bar: u32,
}

impl Timing {
    fn new(timeline: &MidiTimeline) -> Self {
        let ticks_per_beat = u64::from(timeline.ticks_per_beat.max(1));
        Self {
            ticks_per_beat,
            ticks_per_part: ticks_per_beat as f64 / f64::from(PARTS_PER_BEAT),
            beats_per_bar: timeline.beats_per_bar,
            parts_per_bar: PARTS_PER_BEAT * timeline.beats_per_bar,
        }
    }

    fn quantize(&self, tick: u64) -> u32 {
        (tick as f64 / self.ticks_per_part).round() as u32
    }

    fn bar_start_tick(&self, bar: u32) -> u64 {
        u64::from(bar) * u64::from(self.beats_per_bar) * self.ticks_per_beat
    }

    fn total_bars(&self, end_tick: u64) -> usize {
        (end_tick as f64 / self.ticks_per_part / f64::from(self.parts_per_bar)).ceil() as usize
    }
}

fn tempo(microseconds_per_beat: u32) -> u32 {
    let bpm = (MICROSECONDS_PER_MINUTE / f64::from(microseconds_per_beat)).round();
    bpm.clamp(f64::from(TEMPO_MIN), f64::from(TEMPO_MAX)) as u32
}

/// Key index from a key signature: the relative major, moved half way round
/// the circle of fifths when the sharp count is odd.
pub(crate) fn key_from_signature(sharps: i8, is_minor: bool) -> usize {
    let mut key = i32::from(sharps);
    if is_minor {
        key += 3;
    }
    if key & 1 == 1 {
        key += 6;
    }
    key.rem_euclid(12) as usize
}

/// Build every channel of `timeline`, uncompacted.
pub(crate) fn translate(timeline: &MidiTimeline) -> SongImport {
    let timing = Timing::new(timeline);
    let key = key_from_signature(timeline.sharps, timeline.is_minor);
    let total_bars = timing.total_bars(timeline.end_tick);

    let mut import = SongImport {
        tempo: tempo(timeline.microseconds_per_beat),
        beats_per_bar: timeline.beats_per_bar,
        key,
        ..SongImport::default()
    };

    for (midi_channel, state) in timeline.channels.iter().enumerate() {
        let Some(first) = state.notes.first() else {
            continue;
        };
        let preset = first.program.and_then(midi_program_to_preset);
        let is_drumset = midi_channel == DRUMSET_MIDI_CHANNEL;
        let is_noise = is_drumset || preset.map_or(false, |p| p.is_noise);
        let is_mod = preset.map_or(false, |p| p.is_mod());

        let mut channel = if is_drumset {
            translate_drumset(&state.notes, &timing)
        } else {
            let shape = ChannelShape::new(is_noise, is_mod, key);
            PitchedChannelBuilder::new(shape, timing, state).build()
        };
        channel.bars.resize(channel.bars.len().max(total_bars), 0);

        log::debug!(
            "[MIDI] channel {}: {} patterns, {} instruments{}",
            midi_channel,
            channel.patterns.len(),
            channel.instruments.len(),
            if is_drumset { " (drumset)" } else { "" }
        );
        if is_noise {
            if is_drumset {
                import.noise_channels.insert(0, channel);
            } else {
                import.noise_channels.push(channel);
            }
        } else if is_mod {
            import.mod_channels.push(channel);
        } else {
            import.pitch_channels.push(channel);
        }
    }
    import
}

/// Append a pattern for `bar` unless `current_bar` already has one, padding
/// the skipped bars with no pattern. Returns whether a pattern was created.
fn ensure_pattern(channel: &mut Channel, current_bar: &mut Option<u32>, bar: u32, instrument: usize) -> bool {
    if *current_bar == Some(bar) && !channel.patterns.is_empty() {
        return false;
    }
    channel.bars.resize(bar as usize, 0);
    channel.patterns.push(Pattern::new(instrument));
    channel.bars.push(channel.patterns.len());
    *current_bar = Some(bar);
    true
}

// ---------------------------------------------------------------------------
// Drumset channel
// ---------------------------------------------------------------------------

fn translate_drumset(notes: &[NoteEvent], timing: &Timing) -> Channel {
    let instrument = preset_by_name(DRUMSET_PRESET)
        .map_or_else(|| Instrument::new(InstrumentKind::Drumset), Instrument::from_preset);
    let mut channel = Channel::with_instrument(instrument);
    let parts_per_bar = timing.parts_per_bar;

    let mut held: Vec<u8> = Vec::new();
    let mut current_bar = None;
    let mut prev_part = 0u32;
    let mut volume_set = false;
    let mut velocity = 1.0;
    let mut instrument_volume = 0;
    let mut instrument_pan = PAN_CENTER;

    for index in 0..=notes.len() {
        let event = notes.get(index);
        let next_part = event.map_or(u32::MAX, |e| timing.quantize(e.tick));
        if !held.is_empty() && next_part > prev_part && event.map_or(true, |e| e.on) {
            let bar = prev_part / parts_per_bar;
            let bar_start = bar * parts_per_bar;
            ensure_pattern(&mut channel, &mut current_bar, bar, 0);

            let instrument = &mut channel.instruments[0];
            if !volume_set || instrument.volume > instrument_volume {
                instrument.volume = instrument_volume;
                instrument.pan = instrument_pan;
                volume_set = true;
            }

            let mut frequencies: Vec<i32> = Vec::new();
            let mut min_duration = (DRUM_COUNT - 1) as u32;
            let mut max_duration = 0;
            let mut expression = 1;
            for drum in held.iter().filter_map(|&key| analogous_drum(key)) {
                if !frequencies.contains(&drum.frequency) {
                    frequencies.push(drum.frequency);
                }
                expression = expression.max((f64::from(drum.volume) * velocity).round() as u32);
                min_duration = min_duration.min(drum.duration);
                max_duration = max_duration.max(drum.duration);
            }
            let duration = max_duration.min(min_duration.max(2));
            let start = prev_part - bar_start;
            let end = parts_per_bar.min(next_part.saturating_sub(bar_start)).min(start + duration * 6);

            let mut note = Note::new(-1, start, end, expression, true);
            note.pitches = frequencies[frequencies.len().saturating_sub(MAX_CHORD_SIZE)..].iter().copied().collect();
            if let Some(pattern) = channel.patterns.last_mut() {
                pattern.notes.push(note);
            }
            held.clear();
        }

        if let Some(event) = event.filter(|e| e.on && analogous_drum(e.pitch).is_some()) {
            held.push(event.pitch);
            prev_part = next_part;
            velocity = event.velocity;
            instrument_volume = event.instrument_volume;
            instrument_pan = event.instrument_pan;
        }
    }
    channel
}

// ---------------------------------------------------------------------------
// Pitched, noise and mod channels
// ---------------------------------------------------------------------------

/// How MIDI pitches map onto a channel's pitch range.
#[derive(Clone, Copy, Debug)]
struct ChannelShape {
    is_noise: bool,
    is_mod: bool,
    base_pitch: i32,
    /// Channel pitch units per semitone step
    interval_scale: f64,
    /// Semitones per MIDI key
    midi_interval_scale: f64,
    max_pitch: i32,
}

impl ChannelShape {
    fn new(is_noise: bool, is_mod: bool, key: usize) -> Self {
        if is_noise {
            Self {
                is_noise,
                is_mod,
                base_pitch: SPECTRUM_BASE_PITCH,
                interval_scale: f64::from(NOISE_INTERVAL),
                midi_interval_scale: 0.5,
                max_pitch: DRUM_COUNT - 1,
            }
        } else {
            Self {
                is_noise,
                is_mod,
                base_pitch: KEYS[key].base_pitch,
                interval_scale: 1.0,
                midi_interval_scale: 1.0,
                max_pitch: MAX_PITCH,
            }
        }
    }

    fn new_instrument(&self, preset: Option<&'static Preset>) -> Instrument {
        match preset {
            Some(preset) if preset.is_noise == self.is_noise => Instrument::from_preset(preset),
            _ => {
                let kind = if self.is_mod {
                    InstrumentKind::Mod
                } else if self.is_noise {
                    InstrumentKind::Noise
                } else {
                    InstrumentKind::Chip { wave: 0 }
                };
                Instrument::new(kind)
            }
        }
    }
}

/// Step-holding cursor over a sorted controller timeline. Only moves forward.
struct Envelope<'a, T> {
    events: &'a [T],
    index: usize,
    value: f64,
}

impl<'a, T> Envelope<'a, T> {
    fn new(events: &'a [T], initial: f64) -> Self {
        Self { events, index: 0, value: initial }
    }

    fn advance(&mut self, tick: u64, event: impl Fn(&T) -> (u64, f64)) -> f64 {
        while let Some((at, value)) = self.events.get(self.index).map(&event) {
            if at > tick {
                break;
            }
            self.value = value;
            self.index += 1;
        }
        self.value
    }
}

fn bend(e: &PitchBendEvent) -> (u64, f64) {
    (e.tick, e.interval)
}

fn expression(e: &ExpressionEvent) -> (u64, f64) {
    (e.tick, e.volume)
}

/// Notes currently sounding and the controller values captured with the
/// most recent note on.
struct HeldNotes {
    pitches: Vec<u8>,
    velocity: f64,
    program: u8,
    instrument_volume: u32,
    instrument_pan: u32,
}

struct PitchedChannelBuilder<'a> {
    shape: ChannelShape,
    timing: Timing,
    notes: &'a [NoteEvent],
    bends: Envelope<'a, PitchBendEvent>,
    expressions: Envelope<'a, ExpressionEvent>,
    channel: Channel,
    instrument_by_program: [Option<usize>; 128],
    current_bar: Option<u32>,
    held: HeldNotes,
    pitch_sum: f64,
    pitch_weight: f64,
}

/// One stretch of held pitches clipped to a single bar.
#[derive(Clone, Copy, Debug)]
struct Span {
    bar: u32,
    start_part: u32,
    end_part: u32,
    start_tick: u64,
    end_tick: u64,
}

impl<'a> PitchedChannelBuilder<'a> {
    fn new(shape: ChannelShape, timing: Timing, state: &'a MidiChannelState) -> Self {
        Self {
            shape,
            timing,
            notes: &state.notes,
            bends: Envelope::new(&state.pitch_bends, 0.0),
            expressions: Envelope::new(&state.expressions, 3.0),
            channel: Channel::default(),
            instrument_by_program: [None; 128],
            current_bar: None,
            held: HeldNotes {
                pitches: Vec::new(),
                velocity: 1.0,
                program: 0,
                instrument_volume: 0,
                instrument_pan: PAN_CENTER,
            },
            pitch_sum: 0.0,
            pitch_weight: 0.0,
        }
    }

    fn build(mut self) -> Channel {
        let parts_per_bar = self.timing.parts_per_bar;
        let mut prev_tick = 0u64;
        let mut prev_part = 0u32;

        for event in self.notes {
            let next_tick = event.tick;
            let next_part = self.timing.quantize(next_tick);
            if !self.held.pitches.is_empty() && next_part > prev_part {
                let start_bar = prev_part / parts_per_bar;
                let end_bar = next_part.div_ceil(parts_per_bar);
                for bar in start_bar..end_bar {
                    let bar_start_part = bar * parts_per_bar;
                    let span = Span {
                        bar,
                        start_part: prev_part.saturating_sub(bar_start_part),
                        end_part: parts_per_bar.min(next_part - bar_start_part),
                        start_tick: self.timing.bar_start_tick(bar).max(prev_tick),
                        end_tick: self.timing.bar_start_tick(bar + 1).min(next_tick),
                    };
                    if span.start_part < span.end_part {
                        self.add_note(span);
                    }
                }
            }

            if let Some(found) = self.held.pitches.iter().position(|&p| p == event.pitch) {
                self.held.pitches.remove(found);
            }
            if event.on {
                self.held.pitches.push(event.pitch);
                self.held.velocity = event.velocity;
                self.held.program = event.program.unwrap_or(0);
                self.held.instrument_volume = event.instrument_volume;
                self.held.instrument_pan = event.instrument_pan;
            }
            prev_tick = next_tick;
            prev_part = next_part;
        }

        if !self.shape.is_noise && !self.shape.is_mod && self.pitch_weight > 0.0 {
            let average = self.pitch_sum / self.pitch_weight;
            let octave = (average / f64::from(PITCHES_PER_OCTAVE) - 1.5).round() as i32;
            self.channel.octave = octave.clamp(0, SCROLLABLE_OCTAVES);
        }
        self.channel
    }

    /// Pattern for `bar`, creating it (and the program's instrument) on
    /// first use, then apply the loudest-wins volume rule.
    fn prepare_bar(&mut self, bar: u32, preset: Option<&'static Preset>) {
        let program = usize::from(self.held.program);
        if ensure_pattern(&mut self.channel, &mut self.current_bar, bar, 0) {
            let index = match self.instrument_by_program[program] {
                Some(index) => index,
                None => {
                    let mut instrument = self.shape.new_instrument(preset);
                    instrument.volume = self.held.instrument_volume;
                    instrument.pan = self.held.instrument_pan;
                    self.channel.instruments.push(instrument);
                    let index = self.channel.instruments.len() - 1;
                    self.instrument_by_program[program] = Some(index);
                    index
                }
            };
            if let Some(pattern) = self.channel.patterns.last_mut() {
                pattern.instrument = index;
            }
        }

        if let Some(index) = self.instrument_by_program[program] {
            let instrument = &mut self.channel.instruments[index];
            if self.held.instrument_volume < instrument.volume {
                instrument.volume = self.held.instrument_volume;
                instrument.pan = self.held.instrument_pan;
            }
        }
    }

    fn add_note(&mut self, span: Span) {
        let preset = midi_program_to_preset(self.held.program);
        self.prepare_bar(span.bar, preset);

        let shape = self.shape;
        let velocity = self.held.velocity;
        let bar_start_part = span.bar * self.timing.parts_per_bar;

        let interval = self.bends.advance(span.start_tick, bend);
        let mut expression_value = self.expressions.advance(span.start_tick, expression);
        let shifted_held_pitch = f64::from(self.held.pitches[0]) * shape.midi_interval_scale - f64::from(shape.base_pitch);
        let held_pitch_offset = (interval - f64::from(shape.base_pitch)).round();
        let start = EnvelopeSample {
            pitch: (shifted_held_pitch + interval) / shape.interval_scale,
            volume: velocity * expression_value,
        };

        let mut samples = Vec::with_capacity((span.end_part - span.start_part) as usize);
        for part in span.start_part + 1..=span.end_part {
            let tick = (self.timing.ticks_per_part * f64::from(part + bar_start_part)).round() as u64;
            let tick = tick.clamp(span.start_tick, span.end_tick.saturating_sub(1).max(span.start_tick));
            let interval = self.bends.advance(tick, bend);
            expression_value = self.expressions.advance(tick, expression);
            samples.push(EnvelopeSample {
                pitch: (interval + shifted_held_pitch) / shape.interval_scale,
                volume: velocity * expression_value,
            });
        }
        let pins = reconstruct_pins(start, &samples);

        // keep every pin inside the channel's pitch range
        let mut max_pitch = shape.max_pitch;
        let mut min_pitch = 0;
        for pin in &pins {
            max_pitch = max_pitch.min(shape.max_pitch - pin.interval);
            min_pitch = min_pitch.max(-pin.interval);
        }

        let subharmonic = preset.and_then(|p| p.midi_subharmonic).unwrap_or(0);
        let held = &self.held.pitches;
        let mut pitches = ArrayVec::<i32, MAX_CHORD_SIZE>::new();
        for &key in &held[held.len().saturating_sub(MAX_CHORD_SIZE)..] {
            let held_pitch = f64::from(key) * shape.midi_interval_scale - f64::from(subharmonic);
            let shifted = ((held_pitch + held_pitch_offset) / shape.interval_scale).round() as i32;
            let shifted = shifted.min(max_pitch).max(min_pitch);
            if !pitches.contains(&shifted) {
                pitches.push(shifted);
                let weight = f64::from(span.end_part - span.start_part);
                self.pitch_sum += f64::from(shifted) * weight;
                self.pitch_weight += weight;
            }
        }

        let note = Note { pitches, pins, start: span.start_part, end: span.end_part };
        if let Some(pattern) = self.channel.patterns.last_mut() {
            pattern.notes.push(note);
        }
    }
}
