//! Song structure: channels, bar sequencing and song-level settings.

use alloc::vec;
use alloc::vec::Vec;

use crate::config::{
    BAR_COUNT_MAX, CHROMATIC_SCALE, INSTRUMENTS_PER_CHANNEL_MAX, KEYS, PITCH_CHANNEL_COUNT_MAX,
    MOD_CHANNEL_COUNT_MAX, NOISE_CHANNEL_COUNT_MAX, SCALES,
};
use crate::instrument::{Instrument, InstrumentKind};
use crate::pattern::Pattern;

/// One channel: its instruments, its patterns and which pattern plays in each bar.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Channel {
    /// Octave offset of the pitch window (pitched channels only)
    pub octave: i32,
    pub instruments: Vec<Instrument>,
    pub patterns: Vec<Pattern>,
    /// 1-based pattern index per bar; 0 = no pattern
    pub bars: Vec<usize>,
}

impl Channel {
    /// An empty channel with a single default instrument.
    pub fn with_instrument(instrument: Instrument) -> Self {
        Self {
            octave: 0,
            instruments: vec![instrument],
            patterns: Vec::new(),
            bars: Vec::new(),
        }
    }

    /// Pattern playing in `bar`, if any.
    pub fn pattern_at(&self, bar: usize) -> Option<&Pattern> {
        match self.bars.get(bar).copied() {
            None | Some(0) => None,
            Some(index) => self.patterns.get(index - 1),
        }
    }

    /// Number of bars with a pattern.
    pub fn used_bars(&self) -> usize {
        self.bars.iter().filter(|&&b| b != 0).count()
    }
}

/// A complete song.
///
/// `channels` holds the pitch channels first, then the noise channels, then
/// the mod channels.
#[derive(Clone, Debug, PartialEq)]
pub struct Song {
    /// Index into `KEYS`
    pub key: usize,
    /// Index into `SCALES`
    pub scale: usize,
    /// Beats per minute
    pub tempo: u32,
    pub beats_per_bar: u32,
    pub bar_count: usize,
    pub loop_start: usize,
    pub loop_length: usize,
    pub pitch_channel_count: usize,
    pub noise_channel_count: usize,
    pub mod_channel_count: usize,
    pub channels: Vec<Channel>,
}

impl Default for Song {
    fn default() -> Self {
        let bar_count = 16;
        let mut channels = Vec::new();
        for _ in 0..3 {
            let mut channel = Channel::with_instrument(Instrument::new(InstrumentKind::Chip { wave: 0 }));
            channel.bars = vec![0; bar_count];
            channels.push(channel);
        }
        let mut noise = Channel::with_instrument(Instrument::new(InstrumentKind::Noise));
        noise.bars = vec![0; bar_count];
        channels.push(noise);
        Self {
            key: 0,
            scale: 0,
            tempo: 150,
            beats_per_bar: 8,
            bar_count,
            loop_start: 0,
            loop_length: 4,
            pitch_channel_count: 3,
            noise_channel_count: 1,
            mod_channel_count: 0,
            channels,
        }
    }
}

impl Song {
    pub fn get_pattern(&self, channel: usize, bar: usize) -> Option<&Pattern> {
        self.channels.get(channel)?.pattern_at(bar)
    }

    pub fn channel_is_noise(&self, channel: usize) -> bool {
        channel >= self.pitch_channel_count
            && channel < self.pitch_channel_count + self.noise_channel_count
    }

    /// MIDI pitch of pitch 0 on pitched channels.
    pub fn base_pitch(&self) -> i32 {
        KEYS[self.key % KEYS.len()].base_pitch
    }

    pub fn scale_is_minor(&self) -> bool {
        SCALES[self.scale % SCALES.len()].is_minor()
    }

    /// Build the song that an imported channel set replaces this one with.
    ///
    /// Songs longer than `BAR_COUNT_MAX` bars are cut, each channel keeps at
    /// most `INSTRUMENTS_PER_CHANNEL_MAX` instruments (patterns using a dropped
    /// one fall back to instrument 0), and identical patterns are merged. The
    /// scale switches to chromatic, every channel is padded to the song length
    /// and the loop spans the whole song.
    pub fn from_import(import: SongImport) -> Self {
        let SongImport {
            mut pitch_channels,
            mut noise_channels,
            mut mod_channels,
            tempo,
            beats_per_bar,
            key,
        } = import;

        for channel in pitch_channels.iter_mut().chain(&mut noise_channels).chain(&mut mod_channels) {
            limit_channel(channel);
        }
        remove_duplicate_patterns(&mut pitch_channels);
        remove_duplicate_patterns(&mut noise_channels);
        remove_duplicate_patterns(&mut mod_channels);

        pitch_channels.truncate(PITCH_CHANNEL_COUNT_MAX);
        noise_channels.truncate(NOISE_CHANNEL_COUNT_MAX);
        mod_channels.truncate(MOD_CHANNEL_COUNT_MAX);
        if pitch_channels.is_empty() {
            pitch_channels.push(Channel::with_instrument(Instrument::new(InstrumentKind::Chip { wave: 0 })));
        }

        let pitch_channel_count = pitch_channels.len();
        let noise_channel_count = noise_channels.len();
        let mod_channel_count = mod_channels.len();

        let mut channels = pitch_channels;
        channels.append(&mut noise_channels);
        channels.append(&mut mod_channels);

        let bar_count = channels.iter().map(|c| c.bars.len()).max().unwrap_or(0).max(1);
        for channel in &mut channels {
            channel.bars.resize(bar_count, 0);
        }

        Self {
            key,
            scale: CHROMATIC_SCALE,
            tempo,
            beats_per_bar,
            bar_count,
            loop_start: 0,
            loop_length: bar_count,
            pitch_channel_count,
            noise_channel_count,
            mod_channel_count,
            channels,
        }
    }
}

/// Channels and song-level settings reconstructed from an imported file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SongImport {
    pub pitch_channels: Vec<Channel>,
    /// The drumset channel, if any, comes first
    pub noise_channels: Vec<Channel>,
    pub mod_channels: Vec<Channel>,
    pub tempo: u32,
    pub beats_per_bar: u32,
    pub key: usize,
}

/// Cut `channel` down to the song-size limits.
///
/// Bars past the limit go away; `remove_duplicate_patterns` then drops the
/// patterns only they used, which keeps the pattern count within the bar count.
fn limit_channel(channel: &mut Channel) {
    channel.bars.truncate(BAR_COUNT_MAX);
    channel.instruments.truncate(INSTRUMENTS_PER_CHANNEL_MAX);
    let instrument_count = channel.instruments.len();
    for pattern in &mut channel.patterns {
        if pattern.instrument >= instrument_count {
            pattern.instrument = 0;
        }
    }
}

/// Merge patterns with identical instrument and notes.
///
/// Surviving patterns are renumbered in order of first use; patterns no bar
/// refers to are dropped.
pub fn remove_duplicate_patterns(channels: &mut [Channel]) {
    for channel in channels {
        let mut unique: Vec<Pattern> = Vec::new();
        for bar in 0..channel.bars.len() {
            let index = channel.bars[bar];
            if index == 0 {
                continue;
            }
            let Some(pattern) = channel.patterns.get(index - 1) else {
                channel.bars[bar] = 0;
                continue;
            };
            match unique.iter().position(|p| p == pattern) {
                Some(found) => channel.bars[bar] = found + 1,
                None => {
                    unique.push(pattern.clone());
                    channel.bars[bar] = unique.len();
                }
            }
        }
        channel.patterns = unique;
    }
}
