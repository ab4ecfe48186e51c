//! SMF chunk splitting and the time-stepped event simulation.
//!
//! Every track is walked in tick order while per-MIDI-channel controller
//! state is tracked, producing note, pitch bend and expression timelines
//! for each of the 16 channels.

use np_ir::config::{BEATS_PER_BAR_MAX, BEATS_PER_BAR_MIN, PAN_CENTER, PAN_MAX, VOLUME_RANGE};
use np_ir::volume::{
    midi_expression_to_volume_mult, midi_volume_to_volume_mult, volume_mult_to_expression,
    volume_mult_to_instrument_volume,
};

use crate::byte_reader::ByteReader;
use crate::midi::*;
use crate::FormatError;

pub(crate) const MIDI_CHANNEL_COUNT: usize = 16;
const DEFAULT_MICROSECONDS_PER_BEAT: u32 = 500_000;
const DEFAULT_BEATS_PER_BAR: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct NoteEvent {
    pub tick: u64,
    pub pitch: u8,
    /// 0..=1
    pub velocity: f64,
    /// Program, instrument volume and pan at note on; `None` for note off
    pub program: Option<u8>,
    pub instrument_volume: u32,
    pub instrument_pan: u32,
    pub on: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PitchBendEvent {
    pub tick: u64,
    /// Semitones
    pub interval: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ExpressionEvent {
    pub tick: u64,
    /// Note pin volume scale
    pub volume: f64,
}

/// Simulated controller state and collected events for one MIDI channel.
#[derive(Clone, Debug)]
pub(crate) struct MidiChannelState {
    pub(crate) rpn_msb: u8,
    pub(crate) rpn_lsb: u8,
    pub(crate) bend_range_msb: u8,
    pub(crate) bend_range_lsb: u8,
    pub(crate) program: u8,
    pub(crate) volume: u8,
    pub(crate) pan: u8,
    pub notes: Vec<NoteEvent>,
    pub pitch_bends: Vec<PitchBendEvent>,
    pub expressions: Vec<ExpressionEvent>,
}

impl Default for MidiChannelState {
    fn default() -> Self {
        Self {
            rpn_msb: 0xFF,
            rpn_lsb: 0xFF,
            // two semitones, zero cents
            bend_range_msb: 2,
            bend_range_lsb: 0,
            program: 0,
            volume: 100,
            pan: 64,
            notes: Vec::new(),
            pitch_bends: Vec::new(),
            expressions: Vec::new(),
        }
    }
}

impl MidiChannelState {
    fn pitch_bend_range_selected(&self) -> bool {
        (self.rpn_msb, self.rpn_lsb) == RPN_PITCH_BEND_RANGE
    }

    fn pitch_bend_range(&self) -> f64 {
        f64::from(self.bend_range_msb) + f64::from(self.bend_range_lsb) * 0.01
    }
}

/// Everything the simulation learned about a file.
#[derive(Clone, Debug)]
pub(crate) struct MidiTimeline {
    pub ticks_per_beat: u16,
    pub microseconds_per_beat: u32,
    pub beats_per_bar: u32,
    pub sharps: i8,
    pub is_minor: bool,
    /// Tick of the last event
    pub end_tick: u64,
    pub channels: [MidiChannelState; MIDI_CHANNEL_COUNT],
}

/// Per-track decoding state.
struct TrackCursor<'a> {
    reader: ByteReader<'a>,
    next_event_tick: u64,
    ended: bool,
    running_status: Option<u8>,
}

/// Split `data` into its header and track chunks.
fn split_chunks(data: &[u8]) -> Result<(MidiHeader, Vec<TrackCursor<'_>>), FormatError> {
    let mut reader = ByteReader::new(data);
    let mut header = None;
    let mut tracks = Vec::new();
    while reader.has_more() {
        let chunk_type = reader.read_u32()?;
        let length = reader.read_u32()? as usize;
        match chunk_type {
            CHUNK_HEADER => {
                let body = reader.read_bytes(length)?;
                if header.is_none() {
                    header = Some(MidiHeader::parse(body)?);
                } else {
                    log::warn!("[MIDI] ignoring extra header chunk");
                }
            }
            CHUNK_TRACK => {
                let mut track = reader.reader_for_next_bytes(length)?;
                if track.has_more() {
                    let first_delta = track.read_midi_variable_length()?;
                    tracks.push(TrackCursor {
                        reader: track,
                        next_event_tick: u64::from(first_delta),
                        ended: false,
                        running_status: None,
                    });
                }
            }
            other => {
                log::debug!("[MIDI] skipping unknown chunk {:#010x} ({} bytes)", other, length);
                reader.skip_bytes(length)?;
            }
        }
    }
    let header = header.ok_or(FormatError::MissingHeader)?;
    Ok((header, tracks))
}

/// Beats per bar from a time signature, halving while the denominator
/// allows and the count stays even and in range.
pub(crate) fn time_signature_beats_per_bar(numerator: u8, denominator_exponent: u8) -> u32 {
    let mut beats_per_bar = u32::from(numerator) * 4;
    let mut exponent = i32::from(denominator_exponent);
    while beats_per_bar & 1 == 0
        && (exponent > 0 || beats_per_bar > BEATS_PER_BAR_MAX)
        && beats_per_bar >= BEATS_PER_BAR_MIN * 2
    {
        beats_per_bar >>= 1;
        exponent -= 1;
    }
    beats_per_bar.clamp(BEATS_PER_BAR_MIN, BEATS_PER_BAR_MAX)
}

/// Parse `data` and simulate all tracks to the end.
pub(crate) fn parse_midi(data: &[u8]) -> Result<MidiTimeline, FormatError> {
    let (header, mut tracks) = split_chunks(data)?;
    log::debug!(
        "[MIDI] format {}, {} tracks ({} declared), {} ticks per beat",
        header.format,
        tracks.len(),
        header.track_count,
        header.ticks_per_beat
    );

    let mut timeline = MidiTimeline {
        ticks_per_beat: header.ticks_per_beat,
        microseconds_per_beat: DEFAULT_MICROSECONDS_PER_BEAT,
        beats_per_bar: DEFAULT_BEATS_PER_BAR,
        sharps: 0,
        is_minor: false,
        end_tick: 0,
        channels: core::array::from_fn(|_| MidiChannelState::default()),
    };

    // Independent tracks play one after another rather than together.
    let independent = header.format == FORMAT_INDEPENDENT_TRACKS;
    let mut independent_index = 0;
    let mut active: Vec<usize> = if independent {
        (0..tracks.len().min(1)).collect()
    } else {
        (0..tracks.len()).collect()
    };

    let mut current_tick = 0u64;
    loop {
        let mut next_tick = u64::MAX;
        let mut any_track_has_more = false;
        for slot in 0..active.len() {
            let track_index = active[slot];
            while !tracks[track_index].ended && tracks[track_index].next_event_tick == current_tick {
                let track = &mut tracks[track_index];
                let found_end = decode_event(track, &mut timeline, current_tick)?;
                if !found_end && track.reader.has_more() {
                    track.next_event_tick = current_tick + u64::from(track.reader.read_midi_variable_length()?);
                    continue;
                }
                track.ended = true;
                if independent {
                    independent_index += 1;
                    if let Some(next) = tracks.get_mut(independent_index) {
                        active[0] = independent_index;
                        next.next_event_tick += current_tick;
                        next_tick = next_tick.min(next.next_event_tick);
                        any_track_has_more = true;
                    }
                }
            }
            let track = &tracks[track_index];
            if !track.ended {
                any_track_has_more = true;
                next_tick = next_tick.min(track.next_event_tick);
            }
        }
        if !any_track_has_more {
            break;
        }
        current_tick = next_tick;
    }
    timeline.end_tick = current_tick;
    Ok(timeline)
}

/// Decode one event at `tick`. Returns true at the end-of-track event.
fn decode_event(
    track: &mut TrackCursor<'_>,
    timeline: &mut MidiTimeline,
    tick: u64,
) -> Result<bool, FormatError> {
    let reader = &mut track.reader;
    let peeked = reader.peek_u8()?;
    let status = if peeked & 0x80 != 0 {
        reader.read_u8()?
    } else {
        track.running_status.ok_or(FormatError::UnrecognizedEventStatus(peeked))?
    };
    let event_type = status & 0xF0;
    if event_type != EVENT_META_AND_SYSEX {
        track.running_status = Some(status);
    }
    let channel = &mut timeline.channels[usize::from(status & 0x0F)];

    match event_type {
        EVENT_NOTE_OFF => {
            let pitch = reader.read_midi_7bits()?;
            reader.read_midi_7bits()?;
            channel.notes.push(note_off(tick, pitch));
        }
        EVENT_NOTE_ON => {
            let pitch = reader.read_midi_7bits()?;
            let velocity = reader.read_midi_7bits()?;
            if velocity == 0 {
                channel.notes.push(note_off(tick, pitch));
            } else {
                let volume = volume_mult_to_instrument_volume(midi_volume_to_volume_mult(f64::from(channel.volume)))
                    .round()
                    .clamp(0.0, f64::from(VOLUME_RANGE - 1));
                let pan = ((f64::from(channel.pan) - 64.0) / 63.0 + 1.0) * f64::from(PAN_CENTER);
                let pan = pan.round().clamp(0.0, f64::from(PAN_MAX));
                channel.notes.push(NoteEvent {
                    tick,
                    pitch,
                    velocity: ((f64::from(velocity) + 14.0) / 90.0).clamp(0.0, 1.0),
                    program: Some(channel.program),
                    instrument_volume: volume as u32,
                    instrument_pan: pan as u32,
                    on: true,
                });
            }
        }
        EVENT_KEY_PRESSURE => {
            reader.read_midi_7bits()?;
            reader.read_midi_7bits()?;
        }
        EVENT_CONTROL_CHANGE => {
            let message = reader.read_midi_7bits()?;
            let value = reader.read_midi_7bits()?;
            match message {
                CC_SET_PARAMETER_MSB if channel.pitch_bend_range_selected() => channel.bend_range_msb = value,
                CC_SET_PARAMETER_LSB if channel.pitch_bend_range_selected() => channel.bend_range_lsb = value,
                CC_VOLUME_MSB => channel.volume = value,
                CC_PAN_MSB => channel.pan = value,
                CC_EXPRESSION_MSB => channel.expressions.push(ExpressionEvent {
                    tick,
                    volume: volume_mult_to_expression(midi_expression_to_volume_mult(f64::from(value))),
                }),
                CC_RPN_LSB => channel.rpn_lsb = value,
                CC_RPN_MSB => channel.rpn_msb = value,
                _ => {}
            }
        }
        EVENT_PROGRAM_CHANGE => {
            channel.program = reader.read_midi_7bits()?;
        }
        EVENT_CHANNEL_PRESSURE => {
            reader.read_midi_7bits()?;
        }
        EVENT_PITCH_BEND => {
            let lsb = u32::from(reader.read_midi_7bits()?);
            let msb = u32::from(reader.read_midi_7bits()?);
            let bend = f64::from((msb << 7) | lsb) / f64::from(DEFAULT_MIDI_PITCH_BEND) - 1.0;
            channel.pitch_bends.push(PitchBendEvent { tick, interval: bend * channel.pitch_bend_range() });
        }
        EVENT_META_AND_SYSEX => match status {
            EVENT_META => return decode_meta(reader, timeline),
            EVENT_SYSEX_START | EVENT_SYSEX_ESCAPE => {
                let length = reader.read_midi_variable_length()? as usize;
                reader.skip_bytes(length)?;
            }
            _ => return Err(FormatError::UnrecognizedEventStatus(status)),
        },
        _ => return Err(FormatError::UnrecognizedEventStatus(status)),
    }
    Ok(false)
}

fn note_off(tick: u64, pitch: u8) -> NoteEvent {
    NoteEvent {
        tick,
        pitch,
        velocity: 0.0,
        program: None,
        instrument_volume: 0,
        instrument_pan: PAN_CENTER,
        on: false,
    }
}

fn decode_meta(reader: &mut ByteReader<'_>, timeline: &mut MidiTimeline) -> Result<bool, FormatError> {
    let message = reader.read_midi_7bits()?;
    let length = reader.read_midi_variable_length()? as usize;
    match message {
        META_END_OF_TRACK => {
            reader.skip_bytes(length)?;
            return Ok(true);
        }
        META_TEMPO => {
            timeline.microseconds_per_beat = reader.read_u24()?;
            reader.skip_bytes(length.saturating_sub(3))?;
        }
        META_TIME_SIGNATURE => {
            let numerator = reader.read_u8()?;
            let denominator_exponent = reader.read_u8()?;
            reader.read_u8()?; // MIDI clocks per metronome click
            reader.read_u8()?; // 32nd notes per 24 MIDI clocks
            reader.skip_bytes(length.saturating_sub(4))?;
            timeline.beats_per_bar = time_signature_beats_per_bar(numerator, denominator_exponent);
        }
        META_KEY_SIGNATURE => {
            timeline.sharps = reader.read_i8()?;
            timeline.is_minor = reader.read_u8()? == 1;
            reader.skip_bytes(length.saturating_sub(2))?;
        }
        _ => reader.skip_bytes(length)?,
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn file(format: u16, tracks: &[&[u8]]) -> Vec<u8> {
        let mut header = Vec::new();
        header.extend_from_slice(&format.to_be_bytes());
        header.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
        header.extend_from_slice(&96u16.to_be_bytes());
        let mut out = chunk(b"MThd", &header);
        for track in tracks {
            out.extend(chunk(b"MTrk", track));
        }
        out
    }

    #[test]
    fn time_signature_heuristic() {
        assert_eq!(time_signature_beats_per_bar(4, 2), 4); // 4/4
        assert_eq!(time_signature_beats_per_bar(3, 2), 3); // 3/4
        assert_eq!(time_signature_beats_per_bar(6, 3), 3); // 6/8
        assert_eq!(time_signature_beats_per_bar(7, 3), 7); // 7/8 stays odd
        assert_eq!(time_signature_beats_per_bar(2, 1), 4); // 2/2
        assert_eq!(time_signature_beats_per_bar(1, 0), 4); // 1/1
        assert_eq!(time_signature_beats_per_bar(15, 2), 15);
        assert_eq!(time_signature_beats_per_bar(1, 2), 3); // 1/4 clamps up
    }

    #[test]
    fn running_status_matches_explicit_status() {
        let explicit: &[u8] = &[
            0x00, 0x90, 60, 100, 0x00, 0x90, 64, 100, 0x60, 0x80, 60, 0, 0x00, 0x80, 64, 0, 0x00, 0xFF, 0x2F, 0x00,
        ];
        let running: &[u8] = &[
            0x00, 0x90, 60, 100, 0x00, 64, 100, 0x60, 0x80, 60, 0, 0x00, 64, 0, 0x00, 0xFF, 0x2F, 0x00,
        ];
        let a = parse_midi(&file(1, &[explicit])).unwrap();
        let b = parse_midi(&file(1, &[running])).unwrap();
        assert_eq!(a.channels[0].notes, b.channels[0].notes);
        assert_eq!(a.channels[0].notes.len(), 4);
        assert_eq!(a.end_tick, 96);
    }

    #[test]
    fn running_status_is_per_track() {
        // the second track starts with a data byte and has no status of its own
        let first: &[u8] = &[0x00, 0x90, 60, 100, 0x00, 0xFF, 0x2F, 0x00];
        let second: &[u8] = &[0x00, 62, 100, 0x00, 0xFF, 0x2F, 0x00];
        let err = parse_midi(&file(1, &[first, second])).unwrap_err();
        assert!(matches!(err, FormatError::UnrecognizedEventStatus(62)));
    }

    #[test]
    fn independent_tracks_play_in_sequence() {
        let first: &[u8] = &[0x00, 0x90, 60, 100, 0x60, 0x80, 60, 0, 0x00, 0xFF, 0x2F, 0x00];
        let second: &[u8] = &[0x00, 0x91, 62, 100, 0x60, 0x81, 62, 0, 0x00, 0xFF, 0x2F, 0x00];
        let timeline = parse_midi(&file(2, &[first, second])).unwrap();
        assert_eq!(timeline.channels[0].notes[0].tick, 0);
        assert_eq!(timeline.channels[1].notes[0].tick, 96);
        assert_eq!(timeline.channels[1].notes[1].tick, 192);
        assert_eq!(timeline.end_tick, 192);

        let parallel = parse_midi(&file(1, &[first, second])).unwrap();
        assert_eq!(parallel.channels[1].notes[0].tick, 0);
    }

    #[test]
    fn only_pitch_bend_rpn_sets_range() {
        let track: &[u8] = &[
            // select RPN 0,1 (fine tuning) and write 12: must not change the bend range
            0x00, 0xB0, 0x65, 0x00, 0x00, 0xB0, 0x64, 0x01, 0x00, 0xB0, 0x06, 12,
            0x00, 0xE0, 0x00, 0x60, // bend up by half the range
            // now select RPN 0,0 and set 12 semitones
            0x00, 0xB0, 0x64, 0x00, 0x00, 0xB0, 0x06, 12,
            0x00, 0xE0, 0x00, 0x60,
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let timeline = parse_midi(&file(0, &[track])).unwrap();
        let bends = &timeline.channels[0].pitch_bends;
        assert_eq!(bends[0].interval, 1.0);
        assert_eq!(bends[1].interval, 6.0);
    }

    #[test]
    fn meta_events_set_song_settings() {
        let track: &[u8] = &[
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20,
            0x00, 0xFF, 0x58, 0x04, 0x03, 0x02, 0x18, 0x08,
            0x00, 0xFF, 0x59, 0x02, 0xFD, 0x01,
            0x00, 0xFF, 0x06, 0x02, b'h', b'i', // marker, skipped
            0x00, 0xF0, 0x02, 0x7E, 0xF7, // sysex, skipped
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let timeline = parse_midi(&file(1, &[track])).unwrap();
        assert_eq!(timeline.microseconds_per_beat, 500_000);
        assert_eq!(timeline.beats_per_bar, 3);
        assert_eq!(timeline.sharps, -3);
        assert!(timeline.is_minor);
    }

    #[test]
    fn note_on_captures_controller_state() {
        let track: &[u8] = &[
            0x00, 0xC2, 25, // program: steel guitar
            0x00, 0xB2, 0x07, 127, // volume up
            0x00, 0xB2, 0x0A, 0, // hard left
            0x00, 0x92, 60, 76, 0x00, 0x92, 60, 0, 0x00, 0xFF, 0x2F, 0x00,
        ];
        let timeline = parse_midi(&file(1, &[track])).unwrap();
        let notes = &timeline.channels[2].notes;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].program, Some(25));
        assert_eq!(notes[0].instrument_volume, 0);
        assert_eq!(notes[0].instrument_pan, 0);
        assert_eq!(notes[0].velocity, 1.0);
        assert!(notes[0].on);
        assert!(!notes[1].on);
    }

    #[test]
    fn missing_header_and_unknown_chunks() {
        let track: &[u8] = &[0x00, 0xFF, 0x2F, 0x00];
        let no_header = chunk(b"MTrk", track);
        assert!(matches!(parse_midi(&no_header), Err(FormatError::MissingHeader)));

        let mut with_junk = file(1, &[track]);
        with_junk.extend(chunk(b"XFIH", &[1, 2, 3]));
        with_junk.extend(chunk(b"MThd", &[0, 0, 0, 1, 0, 1]));
        let timeline = parse_midi(&with_junk).unwrap();
        assert_eq!(timeline.ticks_per_beat, 96);
    }

    #[test]
    fn truncated_track_fails() {
        let mut bytes = file(1, &[&[0x00, 0x90, 60, 100]]);
        // claim a longer track than the file holds
        let len_at = 14 + 4;
        bytes[len_at..len_at + 4].copy_from_slice(&40u32.to_be_bytes());
        assert!(matches!(parse_midi(&bytes), Err(FormatError::OutOfRange { .. })));
    }
}
