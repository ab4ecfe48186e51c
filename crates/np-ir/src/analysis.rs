//! Song feature analysis: scans a Song to report what it contains.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::fmt;

use crate::song::Song;

/// Summary of a song's contents.
pub struct SongFeatures {
    pub tempo: u32,
    pub beats_per_bar: u32,
    pub bar_count: usize,
    pub pitch_channels: usize,
    pub noise_channels: usize,
    pub mod_channels: usize,
    pub patterns: usize,
    pub total_notes: usize,
    /// Notes with more than one pitch
    pub chords: usize,
    /// Notes whose pins move away from the starting interval
    pub bends: usize,
    /// Lowest and highest MIDI pitch on pitched channels
    pub note_range: Option<(i32, i32)>,
    pub instrument_kinds: BTreeSet<&'static str>,
    pub presets: BTreeSet<&'static str>,
}

/// Analyze a song and return a summary of what it uses.
pub fn analyze(song: &Song) -> SongFeatures {
    let mut features = SongFeatures {
        tempo: song.tempo,
        beats_per_bar: song.beats_per_bar,
        bar_count: song.bar_count,
        pitch_channels: song.pitch_channel_count,
        noise_channels: song.noise_channel_count,
        mod_channels: song.mod_channel_count,
        patterns: 0,
        total_notes: 0,
        chords: 0,
        bends: 0,
        note_range: None,
        instrument_kinds: BTreeSet::new(),
        presets: BTreeSet::new(),
    };

    let base_pitch = song.base_pitch();
    for (index, channel) in song.channels.iter().enumerate() {
        features.patterns += channel.patterns.len();
        for instrument in &channel.instruments {
            features.instrument_kinds.insert(instrument.kind.name());
            if let Some(preset) = instrument.preset {
                features.presets.insert(preset.name);
            }
        }

        let pitched = index < song.pitch_channel_count;
        for pattern in &channel.patterns {
            for note in &pattern.notes {
                features.total_notes += 1;
                if note.pitches.len() > 1 {
                    features.chords += 1;
                }
                if note.pins.iter().any(|pin| pin.interval != 0) {
                    features.bends += 1;
                }
                if pitched {
                    for &pitch in &note.pitches {
                        let midi = base_pitch + pitch;
                        features.note_range = Some(match features.note_range {
                            Some((lo, hi)) => (lo.min(midi), hi.max(midi)),
                            None => (midi, midi),
                        });
                    }
                }
            }
        }
    }

    features
}

impl fmt::Display for SongFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tempo:    {} bpm, {} beats per bar", self.tempo, self.beats_per_bar)?;
        writeln!(
            f,
            "Channels: {} pitch, {} noise, {} mod",
            self.pitch_channels, self.noise_channels, self.mod_channels,
        )?;
        writeln!(f, "Bars:     {} ({} patterns)", self.bar_count, self.patterns)?;
        writeln!(
            f,
            "Notes:    {} total, {} chords, {} bends",
            self.total_notes, self.chords, self.bends,
        )?;
        if let Some((lo, hi)) = self.note_range {
            writeln!(f, "Range:    {} - {} (MIDI)", lo, hi)?;
        }

        let kinds: Vec<&str> = self.instrument_kinds.iter().copied().collect();
        writeln!(f, "Instruments: {}", kinds.join(", "))?;
        if !self.presets.is_empty() {
            let presets: Vec<&str> = self.presets.iter().copied().collect();
            writeln!(f, "Presets:  {}", presets.join(", "))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{Instrument, InstrumentKind};
    use crate::pattern::{Note, NotePin, Pattern};
    use crate::presets::preset_by_name;

    #[test]
    fn default_song_is_empty() {
        let f = analyze(&Song::default());
        assert_eq!(f.total_notes, 0);
        assert_eq!(f.note_range, None);
        assert_eq!(f.pitch_channels, 3);
        assert!(f.instrument_kinds.contains("chip"));
        assert!(f.presets.is_empty());
    }

    #[test]
    fn counts_notes_chords_and_bends() {
        let mut song = Song::default();
        let mut pattern = Pattern::new(0);
        let mut chord = Note::new(0, 0, 12, 3, false);
        chord.pitches.push(7);
        pattern.notes.push(chord);
        let mut bend = Note::new(12, 12, 24, 3, false);
        bend.pins[1] = NotePin::new(2, 12, 3);
        pattern.notes.push(bend);
        song.channels[0].patterns.push(pattern);
        song.channels[0].bars[0] = 1;
        song.channels[3].instruments[0] =
            Instrument::from_preset(preset_by_name("standard drumset").unwrap());

        let f = analyze(&song);
        assert_eq!(f.total_notes, 2);
        assert_eq!(f.chords, 1);
        assert_eq!(f.bends, 1);
        assert_eq!(f.note_range, Some((12, 24)));
        assert!(f.instrument_kinds.contains(InstrumentKind::Drumset.name()));
        assert!(f.presets.contains("standard drumset"));
        assert!(f.to_string().contains("2 total, 1 chords, 1 bends"));
    }
}
