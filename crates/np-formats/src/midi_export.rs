//! Song to Standard MIDI File export.
//!
//! Writes a format 1 file: a meta track with tempo, time signature, key
//! signature and loop markers, then one track per exported channel. Pitch
//! envelopes become pitch bends within a fixed 24 semitone range and volume
//! envelopes become expression controller changes.

use np_ir::config::{
    arpeggio_pitch_index, MAX_CHORD_SIZE, NOISE_INTERVAL, OPERATOR_COUNT, PAN_CENTER,
    PARTS_PER_BEAT, SPECTRUM_BASE_PITCH, TICKS_PER_ARPEGGIO, TICKS_PER_PART, NOTE_VOLUME_MAX,
};
use np_ir::volume::{
    expression_to_volume_mult, instrument_volume_to_volume_mult, volume_mult_to_midi_expression,
    volume_mult_to_midi_volume,
};
use np_ir::{preset_by_name, Instrument, InstrumentKind, Note, Song};

use crate::byte_writer::ByteWriter;
use crate::midi::*;
use crate::FormatError;

const MIDI_TICKS_PER_SYNTH_TICK: u32 = 2;
pub(crate) const MIDI_TICKS_PER_PART: u32 = MIDI_TICKS_PER_SYNTH_TICK * TICKS_PER_PART;
pub(crate) const MIDI_TICKS_PER_BEAT: u32 = MIDI_TICKS_PER_PART * PARTS_PER_BEAT;
const MIDI_TICKS_PER_ARPEGGIO: u32 = TICKS_PER_ARPEGGIO * MIDI_TICKS_PER_PART / TICKS_PER_PART;
/// Semitones either side of the note pitch that pitch bends can reach.
pub(crate) const PITCH_BEND_RANGE: i32 = 24;
const DEFAULT_NOTE_VELOCITY: u32 = 90;
const MAX_MIDI_CHANNELS: u8 = 16;
const DRUM_MIDI_CHANNEL: u8 = 9;

/// Which parts of the song to write out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    /// Bars before the loop
    pub include_intro: bool,
    /// Bars after the loop
    pub include_outro: bool,
    /// Times the loop is played (at least once)
    pub loop_count: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { include_intro: true, include_outro: true, loop_count: 1 }
    }
}

/// Song bars in playback order: intro, the loop repeated, outro.
pub fn unrolled_bars(song: &Song, options: &ExportOptions) -> Vec<usize> {
    let loop_end = song.loop_start + song.loop_length;
    let mut bars = Vec::new();
    if options.include_intro {
        bars.extend(0..song.loop_start);
    }
    for _ in 0..options.loop_count.max(1) {
        bars.extend(song.loop_start..loop_end);
    }
    if options.include_outro {
        bars.extend(loop_end..song.bar_count);
    }
    bars
}

/// A song channel and the MIDI channel it is written on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TrackRole {
    channel: usize,
    midi_channel: u8,
    is_noise: bool,
    is_drumset: bool,
}

/// The first drumset channel takes MIDI channel 9; the rest count up from 0,
/// skipping 9. Channels that don't fit in 16 MIDI channels are dropped.
fn assign_tracks(song: &Song) -> Vec<TrackRole> {
    let mut roles = Vec::new();
    let mut next_midi_channel = 0u8;
    let mut found_drumset = false;
    let exported = (song.pitch_channel_count + song.noise_channel_count).min(song.channels.len());
    for (channel, data) in song.channels[..exported].iter().enumerate() {
        let is_drumset = data
            .instruments
            .first()
            .is_some_and(|i| i.kind == InstrumentKind::Drumset);
        if is_drumset && !found_drumset {
            found_drumset = true;
            roles.push(TrackRole { channel, midi_channel: DRUM_MIDI_CHANNEL, is_noise: true, is_drumset: true });
            continue;
        }
        if next_midi_channel >= MAX_MIDI_CHANNELS {
            log::debug!("[MIDI] no MIDI channel left for channel {}", channel);
            continue;
        }
        roles.push(TrackRole {
            channel,
            midi_channel: next_midi_channel,
            is_noise: song.channel_is_noise(channel),
            is_drumset: false,
        });
        next_midi_channel += 1;
        if next_midi_channel == DRUM_MIDI_CHANNEL {
            next_midi_channel += 1;
        }
    }
    roles
}

/// Export `song` as a Standard MIDI File.
pub fn export_midi(song: &Song, options: &ExportOptions) -> Result<Vec<u8>, FormatError> {
    let bars = unrolled_bars(song, options);
    let roles = assign_tracks(song);

    let mut writer = ByteWriter::new(1024);
    writer.write_u32(CHUNK_HEADER);
    writer.write_u32(HEADER_LENGTH);
    writer.write_u16(FORMAT_SIMULTANEOUS_TRACKS);
    writer.write_u16(1 + roles.len() as u16);
    writer.write_u16(MIDI_TICKS_PER_BEAT as u16);

    write_track(&mut writer, 0, |track| write_meta_track(track, song, options, bars.len()))?;
    for role in &roles {
        write_track(&mut writer, role.midi_channel, |track| write_channel_track(track, song, role, &bars))?;
    }

    let bytes = writer.to_compact_buffer();
    log::debug!(
        "[MIDI] exported {} tracks over {} bars, {} bytes",
        roles.len() + 1,
        bars.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Write one "MTrk" chunk and patch its length once the events are known.
fn write_track<F>(writer: &mut ByteWriter, midi_channel: u8, events: F) -> Result<(), FormatError>
where
    F: FnOnce(&mut TrackEncoder<'_>) -> Result<u32, FormatError>,
{
    writer.write_u32(CHUNK_TRACK);
    let length_index = writer.write_index();
    writer.write_u32(0);

    let mut track = TrackEncoder { writer: &mut *writer, prev_time: 0, midi_channel };
    let end_time = events(&mut track)?;
    track.meta(end_time, META_END_OF_TRACK)?;
    track.writer.write_midi_variable_length(0)?;

    let length = writer.write_index() - length_index - 4;
    writer.rewrite_u32(length_index, length as u32)
}

// ---------------------------------------------------------------------------
// TrackEncoder: delta-timed events on one track
// ---------------------------------------------------------------------------

struct TrackEncoder<'w> {
    writer: &'w mut ByteWriter,
    prev_time: u32,
    midi_channel: u8,
}

impl TrackEncoder<'_> {
    fn event_time(&mut self, time: u32) -> Result<(), FormatError> {
        if time < self.prev_time {
            return Err(FormatError::TimeWentBackwards { prev: self.prev_time, time });
        }
        self.writer.write_midi_variable_length(time - self.prev_time)?;
        self.prev_time = time;
        Ok(())
    }

    fn meta(&mut self, time: u32, message: u8) -> Result<(), FormatError> {
        self.event_time(time)?;
        self.writer.write_u8(EVENT_META);
        self.writer.write_midi_7bits(u32::from(message))
    }

    fn meta_text(&mut self, time: u32, message: u8, text: &str) -> Result<(), FormatError> {
        self.meta(time, message)?;
        self.writer.write_midi_ascii(text)
    }

    fn control(&mut self, time: u32, message: u8, value: i64) -> Result<(), FormatError> {
        if !(0..=0x7F).contains(&value) {
            return Err(FormatError::ControlValueOutOfRange(value));
        }
        self.event_time(time)?;
        self.writer.write_u8(EVENT_CONTROL_CHANGE | self.midi_channel);
        self.writer.write_midi_7bits(u32::from(message))?;
        self.writer.write_midi_7bits(value as u32)
    }

    fn program(&mut self, time: u32, program: u8) -> Result<(), FormatError> {
        self.event_time(time)?;
        self.writer.write_u8(EVENT_PROGRAM_CHANGE | self.midi_channel);
        self.writer.write_midi_7bits(u32::from(program))
    }

    /// 14-bit bend, least significant 7 bits first.
    fn pitch_bend(&mut self, time: u32, bend: u32) -> Result<(), FormatError> {
        self.event_time(time)?;
        self.writer.write_u8(EVENT_PITCH_BEND | self.midi_channel);
        self.writer.write_midi_7bits(bend & 0x7F)?;
        self.writer.write_midi_7bits((bend >> 7) & 0x7F)
    }

    fn note(&mut self, time: u32, event: u8, pitch: i32, velocity: u32) -> Result<(), FormatError> {
        self.event_time(time)?;
        self.writer.write_u8(event | self.midi_channel);
        self.writer.write_midi_7bits(pitch as u32)?;
        self.writer.write_midi_7bits(velocity)
    }
}

// ---------------------------------------------------------------------------
// Meta track
// ---------------------------------------------------------------------------

/// Number of sharps (negative for flats) for a key signature.
fn key_signature_sharps(key: usize, is_minor: bool) -> i8 {
    let mut sharps = key as i32;
    if sharps & 1 == 1 {
        sharps += 6;
    }
    if is_minor {
        sharps += 9;
    }
    while sharps > 6 {
        sharps -= 12;
    }
    sharps as i8
}

fn write_meta_track(
    track: &mut TrackEncoder<'_>,
    song: &Song,
    options: &ExportOptions,
    unrolled_bar_count: usize,
) -> Result<u32, FormatError> {
    let ticks_per_bar = MIDI_TICKS_PER_BEAT * song.beats_per_bar;
    let microseconds_per_beat = (60_000_000.0 / f64::from(song.tempo.max(1))).round() as u32;

    track.meta_text(0, META_TEXT, "Composed with notepin")?;

    track.meta(0, META_TEMPO)?;
    track.writer.write_midi_variable_length(3)?;
    track.writer.write_u24(microseconds_per_beat);

    track.meta(0, META_TIME_SIGNATURE)?;
    track.writer.write_midi_variable_length(4)?;
    track.writer.write_u8(song.beats_per_bar as u8);
    track.writer.write_u8(2); // quarter note denominator (2^2)
    track.writer.write_u8(24); // MIDI clocks per metronome click
    track.writer.write_u8(8); // 32nd notes per 24 MIDI clocks

    let is_minor = song.scale_is_minor();
    track.meta(0, META_KEY_SIGNATURE)?;
    track.writer.write_midi_variable_length(2)?;
    track.writer.write_i8(key_signature_sharps(song.key, is_minor));
    track.writer.write_u8(u8::from(is_minor));

    let mut time = 0u32;
    if options.include_intro {
        time += ticks_per_bar * song.loop_start as u32;
    }
    track.meta_text(time, META_MARKER, "Loop Start")?;

    let loop_count = options.loop_count.max(1);
    for loop_index in 0..loop_count {
        time += ticks_per_bar * song.loop_length as u32;
        let marker = if loop_index + 1 < loop_count { "Loop Repeat" } else { "Loop End" };
        track.meta_text(time, META_MARKER, marker)?;
    }

    if options.include_outro {
        let outro = song.bar_count.saturating_sub(song.loop_start + song.loop_length);
        time += ticks_per_bar * outro as u32;
    }
    let expected = ticks_per_bar * unrolled_bar_count as u32;
    if time != expected {
        return Err(FormatError::BarCountMismatch { marked: time, expected });
    }
    Ok(time)
}

// ---------------------------------------------------------------------------
// Channel tracks
// ---------------------------------------------------------------------------

/// GM program for an instrument without a preset program of its own.
fn instrument_program(instrument: &Instrument, is_noise_channel: bool) -> Result<u8, FormatError> {
    if let Some(program) = instrument.preset.and_then(|p| p.midi_program) {
        return Ok(program);
    }
    match instrument.kind {
        // only the first drumset rides MIDI channel 9
        InstrumentKind::Drumset => Ok(PROGRAM_TAIKO),
        InstrumentKind::Noise | InstrumentKind::Spectrum => {
            Ok(if is_noise_channel { PROGRAM_TAIKO } else { PROGRAM_PAN_FLUTE })
        }
        InstrumentKind::Chip { wave } => {
            Ok(CHIP_WAVE_PROGRAMS.get(usize::from(wave)).copied().unwrap_or(PROGRAM_SAWTOOTH))
        }
        InstrumentKind::Pwm
        | InstrumentKind::Fm
        | InstrumentKind::Harmonics
        | InstrumentKind::CustomChipWave => Ok(PROGRAM_SAWTOOTH),
        InstrumentKind::PickedString => Ok(PROGRAM_STEEL_GUITAR),
        InstrumentKind::Mod => Err(FormatError::UnsupportedInstrument(instrument.kind.name())),
    }
}

fn lerp(a: u32, b: u32, t: f64) -> f64 {
    f64::from(a) + (f64::from(b) - f64::from(a)) * t
}

fn lerp_i(a: i32, b: i32, t: f64) -> f64 {
    f64::from(a) + (f64::from(b) - f64::from(a)) * t
}

/// Pitch bend and expression carried between notes of one track.
struct ChannelState {
    prev_instrument: Option<usize>,
    prev_pitch_bend: u32,
    prev_expression: u32,
    should_reset: bool,
}

/// Per-track constants for note synthesis.
struct ChannelContext<'s> {
    song: &'s Song,
    role: &'s TrackRole,
    channel_root: i32,
    interval_scale: i32,
    /// Pitch shift for noise instruments without their own sub-harmonic
    noise_subharmonic: i32,
}

fn write_channel_track(
    track: &mut TrackEncoder<'_>,
    song: &Song,
    role: &TrackRole,
    bars: &[usize],
) -> Result<u32, FormatError> {
    let name = if role.is_noise { "noise channel" } else { "pitch channel" };
    track.meta_text(0, META_TRACK_NAME, &format!("{} {}", name, role.channel))?;

    // Pitch bend range, then deselect the parameter.
    track.control(0, CC_RPN_MSB, i64::from(RPN_PITCH_BEND_RANGE.0))?;
    track.control(0, CC_RPN_LSB, i64::from(RPN_PITCH_BEND_RANGE.1))?;
    track.control(0, CC_SET_PARAMETER_MSB, i64::from(PITCH_BEND_RANGE))?;
    track.control(0, CC_SET_PARAMETER_LSB, 0)?;
    track.control(0, CC_RPN_MSB, i64::from(RPN_RESET.0))?;
    track.control(0, CC_RPN_LSB, i64::from(RPN_RESET.1))?;

    let ctx = ChannelContext {
        song,
        role,
        channel_root: if role.is_noise { SPECTRUM_BASE_PITCH } else { song.base_pitch() },
        interval_scale: if role.is_noise { NOISE_INTERVAL } else { 1 },
        noise_subharmonic: preset_by_name("taiko drum").and_then(|p| p.midi_subharmonic).unwrap_or(0),
    };
    let mut state = ChannelState {
        prev_instrument: None,
        prev_pitch_bend: DEFAULT_MIDI_PITCH_BEND,
        prev_expression: DEFAULT_MIDI_EXPRESSION,
        should_reset: false,
    };

    // Settings go out at the start even if the first pattern comes later.
    if song.get_pattern(role.channel, 0).is_none() && !song.channels[role.channel].instruments.is_empty() {
        write_instrument_settings(track, &ctx, &mut state, 0, 0)?;
    }

    let ticks_per_bar = MIDI_TICKS_PER_BEAT * song.beats_per_bar;
    let mut bar_start = 0u32;
    for &bar in bars {
        if let Some(pattern) = song.get_pattern(role.channel, bar) {
            let instrument = write_instrument_settings(track, &ctx, &mut state, pattern.instrument, bar_start)?;
            for note in &pattern.notes {
                write_note(track, &ctx, &mut state, instrument, note, bar_start)?;
                state.should_reset = true;
            }
        } else if state.should_reset {
            state.should_reset = false;
            if state.prev_expression != DEFAULT_MIDI_EXPRESSION {
                state.prev_expression = DEFAULT_MIDI_EXPRESSION;
                track.control(bar_start, CC_EXPRESSION_MSB, i64::from(DEFAULT_MIDI_EXPRESSION))?;
            }
            if state.prev_pitch_bend != DEFAULT_MIDI_PITCH_BEND {
                state.prev_pitch_bend = DEFAULT_MIDI_PITCH_BEND;
                track.pitch_bend(bar_start, DEFAULT_MIDI_PITCH_BEND)?;
            }
        }
        bar_start += ticks_per_bar;
    }
    Ok(bar_start)
}

/// Name, program, volume and pan for an instrument, when it changes.
fn write_instrument_settings<'s>(
    track: &mut TrackEncoder<'_>,
    ctx: &ChannelContext<'s>,
    state: &mut ChannelState,
    index: usize,
    time: u32,
) -> Result<&'s Instrument, FormatError> {
    let channel = ctx.role.channel;
    let instrument = ctx.song.channels[channel]
        .instruments
        .get(index)
        .ok_or(FormatError::MissingInstrument { channel, index })?;
    if state.prev_instrument == Some(index) {
        return Ok(instrument);
    }
    state.prev_instrument = Some(index);

    track.meta_text(time, META_INSTRUMENT_NAME, &format!("Instrument {}", index + 1))?;
    if !ctx.role.is_drumset {
        let program = instrument_program(instrument, ctx.role.is_noise)?;
        track.program(time, program)?;
    }

    let volume = volume_mult_to_midi_volume(instrument_volume_to_volume_mult(instrument.volume));
    track.control(time, CC_VOLUME_MSB, volume.round().min(127.0) as i64)?;
    let pan = (f64::from(instrument.pan) / f64::from(PAN_CENTER) - 1.0) * 63.0 + 64.0;
    track.control(time, CC_PAN_MSB, pan.round().min(127.0) as i64)?;
    Ok(instrument)
}

fn validate_note(note: &Note) -> Result<(), FormatError> {
    let well_formed = note.pins.len() >= 2
        && note.pins[0].time == 0
        && note.pins[0].interval == 0
        && note.pins.windows(2).all(|w| w[0].time < w[1].time)
        && note.start < note.end
        && !note.pitches.is_empty();
    if well_formed {
        Ok(())
    } else {
        Err(FormatError::MalformedNote(note.start))
    }
}

fn write_note(
    track: &mut TrackEncoder<'_>,
    ctx: &ChannelContext<'_>,
    state: &mut ChannelState,
    instrument: &Instrument,
    note: &Note,
    bar_start: u32,
) -> Result<(), FormatError> {
    validate_note(note)?;
    let role = ctx.role;
    let scale = ctx.interval_scale;

    let chord = instrument.chord;
    let mut uses_arpeggio = chord.arpeggiates();
    let mut polyphony = if uses_arpeggio { 1 } else { MAX_CHORD_SIZE };
    if chord.custom_interval() {
        match instrument.kind {
            InstrumentKind::Chip { .. } | InstrumentKind::Harmonics => {
                polyphony = 2;
                uses_arpeggio = true;
            }
            InstrumentKind::Fm => polyphony = OPERATOR_COUNT,
            other => log::warn!("[MIDI] custom interval chord on {} instrument", other.name()),
        }
    }

    let note_start_time = bar_start + note.start * MIDI_TICKS_PER_PART;
    let tone_count = polyphony.min(note.pitches.len());
    let velocity = if role.is_drumset {
        let scaled = f64::from(DEFAULT_NOTE_VELOCITY * note.pins[0].volume) / f64::from(NOTE_VOLUME_MAX);
        (scaled.round() as u32).max(1)
    } else {
        DEFAULT_NOTE_VELOCITY
    };

    // Centre the bend window on the main interval, shifted so every pin
    // stays within reach when possible.
    let main_interval = note.pick_main_interval();
    let mut pitch_offset = main_interval * scale;
    if !role.is_drumset {
        let mut max_offset = PITCH_BEND_RANGE;
        let mut min_offset = -PITCH_BEND_RANGE;
        for pin in &note.pins[1..] {
            let interval = pin.interval * scale;
            max_offset = max_offset.min(interval + PITCH_BEND_RANGE);
            min_offset = min_offset.max(interval - PITCH_BEND_RANGE);
        }
        pitch_offset = pitch_offset.max(min_offset).min(max_offset);
    }
    let subharmonic = match instrument.preset.and_then(|p| p.midi_subharmonic) {
        Some(semitones) => semitones,
        None if role.is_noise => ctx.noise_subharmonic,
        None => 0,
    };

    let mut prev_pitches = [-1i32; MAX_CHORD_SIZE];
    let mut next_pitches = [-1i32; MAX_CHORD_SIZE];
    for pins in note.pins.windows(2) {
        let (pin, next_pin) = (pins[0], pins[1]);
        let pin_time = note_start_time + pin.time * MIDI_TICKS_PER_PART;
        let length = (next_pin.time - pin.time) * MIDI_TICKS_PER_PART;

        for tick in 0..length {
            let time = pin_time + tick;
            let t = f64::from(tick) / f64::from(length);
            let linear_volume = lerp(pin.volume, next_pin.volume, t);
            let linear_interval = lerp_i(pin.interval, next_pin.interval, t);

            let interval = linear_interval * f64::from(scale) - f64::from(pitch_offset);
            let pitch_bend = (f64::from(DEFAULT_MIDI_PITCH_BEND) * (1.0 + interval / f64::from(PITCH_BEND_RANGE)))
                .round()
                .clamp(0.0, 16383.0) as u32;
            let expression = volume_mult_to_midi_expression(expression_to_volume_mult(linear_volume))
                .round()
                .min(127.0) as u32;

            if pitch_bend != state.prev_pitch_bend {
                track.pitch_bend(time, pitch_bend)?;
                state.prev_pitch_bend = pitch_bend;
            }
            if expression != state.prev_expression && !role.is_drumset {
                track.control(time, CC_EXPRESSION_MSB, i64::from(expression))?;
                state.prev_expression = expression;
            }

            let note_starting = time == note_start_time;
            for tone in 0..tone_count {
                let mut pitch = note.pitches[tone];
                if role.is_drumset {
                    pitch += main_interval;
                    let key = usize::try_from(pitch)
                        .ok()
                        .and_then(|i| DRUMSET_EXPORT_MAP.get(i))
                        .ok_or(FormatError::UnknownDrumPitch(pitch))?;
                    pitch = i32::from(*key);
                } else {
                    // the last voice plays the arpeggio over the remaining pitches
                    if uses_arpeggio && note.pitches.len() > tone + 1 && tone == tone_count - 1 {
                        let ticks_since_beat = (time - bar_start) % MIDI_TICKS_PER_BEAT;
                        let arpeggio = (ticks_since_beat / MIDI_TICKS_PER_ARPEGGIO) as usize;
                        let step = arpeggio_pitch_index(note.pitches.len() - tone, instrument.fast_two_note_arp, arpeggio);
                        pitch = note.pitches[tone + step];
                    }
                    pitch = ctx.channel_root + pitch * scale + pitch_offset + subharmonic;
                    if role.is_noise {
                        pitch *= 2;
                    }
                }
                next_pitches[tone] = pitch.clamp(0, 127);

                if !note_starting && prev_pitches[tone] != next_pitches[tone] {
                    track.note(time, EVENT_NOTE_OFF, prev_pitches[tone], velocity)?;
                }
            }

            for tone in 0..tone_count {
                if note_starting || prev_pitches[tone] != next_pitches[tone] {
                    track.note(time, EVENT_NOTE_ON, next_pitches[tone], velocity)?;
                    prev_pitches[tone] = next_pitches[tone];
                }
            }
        }
    }

    let note_end_time = bar_start + note.end * MIDI_TICKS_PER_PART;
    for &pitch in &prev_pitches[..tone_count] {
        track.note(note_end_time, EVENT_NOTE_OFF, pitch, velocity)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use np_ir::{Channel, NotePin, Pattern};

    fn one_note_song(pitch: i32, kind: InstrumentKind) -> Song {
        let mut song = Song::default();
        song.tempo = 120;
        song.beats_per_bar = 4;
        song.bar_count = 1;
        song.loop_length = 1;
        song.pitch_channel_count = 1;
        song.noise_channel_count = 0;
        let mut channel = Channel::with_instrument(Instrument::new(kind));
        let mut pattern = Pattern::new(0);
        pattern.notes.push(Note::new(pitch, 0, 24, 3, false));
        channel.patterns.push(pattern);
        channel.bars = vec![1];
        song.channels = vec![channel];
        song
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn unrolls_intro_loops_and_outro() {
        let mut song = Song::default();
        song.bar_count = 6;
        song.loop_start = 1;
        song.loop_length = 2;
        let all = ExportOptions { loop_count: 2, ..Default::default() };
        assert_eq!(unrolled_bars(&song, &all), vec![0, 1, 2, 1, 2, 3, 4, 5]);
        let bare = ExportOptions { include_intro: false, include_outro: false, loop_count: 1 };
        assert_eq!(unrolled_bars(&song, &bare), vec![1, 2]);
    }

    #[test]
    fn drumset_channel_takes_channel_nine() {
        let mut song = Song::default();
        song.pitch_channel_count = 11;
        song.noise_channel_count = 2;
        song.channels = (0..13)
            .map(|i| {
                let kind = if i == 12 { InstrumentKind::Drumset } else { InstrumentKind::Fm };
                Channel::with_instrument(Instrument::new(kind))
            })
            .collect();
        let roles = assign_tracks(&song);
        let midi: Vec<u8> = roles.iter().map(|r| r.midi_channel).collect();
        assert_eq!(midi, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12, 9]);
        assert!(roles[12].is_drumset);
        assert!(roles[11].is_noise);
    }

    #[test]
    fn channels_beyond_sixteen_are_dropped() {
        let mut song = Song::default();
        song.pitch_channel_count = 20;
        song.noise_channel_count = 0;
        song.channels = (0..20).map(|_| Channel::with_instrument(Instrument::new(InstrumentKind::Fm))).collect();
        let roles = assign_tracks(&song);
        assert_eq!(roles.len(), 15);
        assert!(roles.iter().all(|r| r.midi_channel != 9 && r.midi_channel < 16));
    }

    #[test]
    fn key_signatures() {
        assert_eq!(key_signature_sharps(0, false), 0); // C major
        assert_eq!(key_signature_sharps(7, false), 1); // G major
        assert_eq!(key_signature_sharps(1, false), -5); // C# major as Db
        assert_eq!(key_signature_sharps(9, true), 0); // A minor
        assert_eq!(key_signature_sharps(0, true), -3); // C minor
    }

    #[test]
    fn meta_track_tempo_and_time_signature() {
        let song = one_note_song(24, InstrumentKind::Fm);
        let bytes = export_midi(&song, &ExportOptions::default()).unwrap();
        assert_eq!(&bytes[..4], b"MThd");
        assert_eq!(&bytes[8..14], &[0, 1, 0, 2, 0, 96]);
        assert!(contains(&bytes, &[0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]));
        assert!(contains(&bytes, &[0xFF, 0x58, 0x04, 0x04, 0x02, 0x18, 0x08]));
    }

    #[test]
    fn note_events_and_bend_range() {
        let song = one_note_song(24, InstrumentKind::Fm);
        let bytes = export_midi(&song, &ExportOptions::default()).unwrap();
        // RPN 0,0 set to 24 semitones then reset
        assert!(contains(&bytes, &[0xB0, 0x65, 0x00, 0x00, 0xB0, 0x64, 0x00]));
        assert!(contains(&bytes, &[0xB0, 0x06, 24, 0x00, 0xB0, 0x26, 0x00]));
        // key C: pitch 24 is MIDI 36, note on at the start, off one beat later
        assert!(contains(&bytes, &[0x00, 0x90, 36, 90]));
        assert!(contains(&bytes, &[0x60, 0x80, 36, 90]));
    }

    #[test]
    fn mod_instrument_cannot_be_exported() {
        let song = one_note_song(24, InstrumentKind::Mod);
        assert!(matches!(
            export_midi(&song, &ExportOptions::default()),
            Err(FormatError::UnsupportedInstrument("mod"))
        ));
    }

    #[test]
    fn malformed_notes_are_rejected() {
        let mut song = one_note_song(24, InstrumentKind::Fm);
        song.channels[0].patterns[0].notes[0].pins[0] = NotePin::new(2, 0, 3);
        assert!(matches!(
            export_midi(&song, &ExportOptions::default()),
            Err(FormatError::MalformedNote(0))
        ));
    }

    #[test]
    fn chip_waves_map_to_programs() {
        let chip = Instrument::new(InstrumentKind::Chip { wave: 2 });
        assert_eq!(instrument_program(&chip, false).unwrap(), 0x50);
        let odd = Instrument::new(InstrumentKind::Chip { wave: 40 });
        assert_eq!(instrument_program(&odd, false).unwrap(), PROGRAM_SAWTOOTH);
        let noise = Instrument::new(InstrumentKind::Noise);
        assert_eq!(instrument_program(&noise, true).unwrap(), PROGRAM_TAIKO);
        assert_eq!(instrument_program(&noise, false).unwrap(), PROGRAM_PAN_FLUTE);
        let trumpet = Instrument::from_preset(preset_by_name("trumpet").unwrap());
        assert_eq!(instrument_program(&trumpet, false).unwrap(), 56);
    }
}
