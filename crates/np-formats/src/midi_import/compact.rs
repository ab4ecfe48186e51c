//! Merge channels until a channel list fits its cap.

use np_ir::Channel;

/// Bars where both channels play, and bars where neither does.
fn overlap(a: &Channel, b: &Channel) -> (usize, usize) {
    let mut conflicts = 0;
    let mut gaps = 0;
    for (&x, &y) in a.bars.iter().zip(&b.bars) {
        match (x != 0, y != 0) {
            (true, true) => conflicts += 1,
            (false, false) => gaps += 1,
            _ => {}
        }
    }
    (conflicts, gaps)
}

/// Move `b`'s instruments and patterns into `a`, and give `b`'s patterns the
/// bars where `a` is silent. `b`'s patterns in conflicting bars are dropped
/// from the sequence.
fn merge(a: &mut Channel, b: Channel) {
    let instrument_offset = a.instruments.len();
    let pattern_offset = a.patterns.len();
    a.instruments.extend(b.instruments);
    a.patterns.extend(b.patterns.into_iter().map(|mut pattern| {
        pattern.instrument += instrument_offset;
        pattern
    }));
    if a.bars.len() < b.bars.len() {
        a.bars.resize(b.bars.len(), 0);
    }
    for (slot, &incoming) in a.bars.iter_mut().zip(&b.bars) {
        if *slot == 0 && incoming != 0 {
            *slot = incoming + pattern_offset;
        }
    }
}

/// Merge pairs of channels until at most `max` remain.
///
/// Each round merges the pair that plays together in the fewest bars; among
/// equally good pairs the one sharing the most silent bars wins, so that
/// sparse channels pair up first.
pub fn compact_channels(channels: &mut Vec<Channel>, max: usize) {
    while channels.len() > max.max(1) {
        let count = channels.len();
        let mut best = (count - 2, count - 1);
        let mut fewest_conflicts = usize::MAX;
        let mut most_gaps = 0;
        for a in 0..count - 1 {
            for b in a + 1..count {
                let (conflicts, gaps) = overlap(&channels[a], &channels[b]);
                if conflicts < fewest_conflicts || (conflicts == fewest_conflicts && gaps > most_gaps) {
                    best = (a, b);
                    fewest_conflicts = conflicts;
                    most_gaps = gaps;
                }
            }
        }
        let merged = channels.remove(best.1);
        merge(&mut channels[best.0], merged);
        log::debug!(
            "[MIDI] merged channel {} into {} ({} conflicting bars)",
            best.1,
            best.0,
            fewest_conflicts
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use np_ir::{Instrument, InstrumentKind, Note, Pattern};

    fn channel(bars: &[usize], pitch: i32) -> Channel {
        let mut channel = Channel::with_instrument(Instrument::new(InstrumentKind::Fm));
        let mut pattern = Pattern::new(0);
        pattern.notes.push(Note::new(pitch, 0, 12, 3, false));
        channel.patterns.push(pattern);
        channel.bars = bars.to_vec();
        channel
    }

    #[test]
    fn disjoint_channels_merge_without_loss() {
        let mut channels: Vec<Channel> = (0..20)
            .map(|i| {
                let mut bars = vec![0; 20];
                bars[i] = 1;
                channel(&bars, i as i32)
            })
            .collect();
        compact_channels(&mut channels, 6);
        assert_eq!(channels.len(), 6);

        let used: usize = channels.iter().map(Channel::used_bars).sum();
        assert_eq!(used, 20);
        for bar in 0..20 {
            let playing: Vec<&Channel> = channels.iter().filter(|c| c.bars[bar] != 0).collect();
            assert_eq!(playing.len(), 1, "bar {bar}");
            let pattern = playing[0].pattern_at(bar).unwrap();
            assert_eq!(pattern.notes[0].pitches[0], bar as i32);
            assert!(pattern.instrument < playing[0].instruments.len());
        }
    }

    #[test]
    fn fewest_conflicts_wins() {
        let mut channels = vec![
            channel(&[1, 1, 0, 0], 0),
            channel(&[1, 1, 0, 0], 1),
            channel(&[0, 0, 1, 1], 2),
        ];
        compact_channels(&mut channels, 2);
        assert_eq!(channels.len(), 2);
        // channel 0 absorbs channel 2, channel 1 is untouched
        assert_eq!(channels[0].bars, vec![1, 1, 2, 2]);
        assert_eq!(channels[0].patterns[1].instrument, 1);
        assert_eq!(channels[1].bars, vec![1, 1, 0, 0]);
    }

    #[test]
    fn conflicting_bars_keep_the_first_channel() {
        let mut channels = vec![channel(&[1, 1], 0), channel(&[1, 0, 1], 1)];
        compact_channels(&mut channels, 1);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].bars, vec![1, 1, 2]);
        assert_eq!(channels[0].instruments.len(), 2);
    }

    #[test]
    fn ties_prefer_shared_silence() {
        let mut channels = vec![
            channel(&[1, 0, 0, 0], 0),
            channel(&[0, 1, 0, 0], 1),
            channel(&[0, 0, 1, 1], 2),
        ];
        compact_channels(&mut channels, 2);
        // 0 and 1 share two silent bars, every other pair shares fewer
        assert_eq!(channels[0].bars, vec![1, 2, 0, 0]);
        assert_eq!(channels[1].bars, vec![0, 0, 1, 1]);
    }

    #[test]
    fn under_cap_is_untouched() {
        let mut channels = vec![channel(&[1], 0)];
        compact_channels(&mut channels, 3);
        assert_eq!(channels.len(), 1);
        compact_channels(&mut channels, 0);
        assert_eq!(channels.len(), 1);
    }
}
