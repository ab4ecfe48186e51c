//! Songs exported through the controller and imported back.

use np_ir::{analyze, Channel, Instrument, InstrumentKind, Note, Pattern, Song};
use np_master::{Controller, ExportOptions};

fn note(pitch: i32) -> Note {
    Note::new(pitch, 0, 24, 3, false)
}

/// 4 bars of 4 beats at 120 bpm, looping bars 1..3, one note per bar on a
/// single pitch channel.
fn four_bar_song() -> Song {
    let mut song = Song::default();
    song.tempo = 120;
    song.beats_per_bar = 4;
    song.bar_count = 4;
    song.loop_start = 1;
    song.loop_length = 2;
    song.pitch_channel_count = 1;
    song.noise_channel_count = 0;

    let mut channel = Channel::with_instrument(Instrument::new(InstrumentKind::Chip { wave: 1 }));
    for (bar, pitch) in [24, 26, 28, 29].into_iter().enumerate() {
        channel.patterns.push(Pattern { notes: vec![note(pitch)], instrument: 0 });
        channel.bars.push(bar + 1);
    }
    song.channels = vec![channel];
    song
}

fn reimport(song: &Song, options: &ExportOptions) -> Song {
    let bytes = np_formats::export_midi(song, options).unwrap();
    let mut ctrl = Controller::new();
    ctrl.load_midi(&bytes).unwrap();
    ctrl.song().clone()
}

fn bar_pitches(song: &Song, channel: usize) -> Vec<Option<i32>> {
    (0..song.bar_count)
        .map(|bar| song.get_pattern(channel, bar).map(|p| p.notes[0].pitches[0]))
        .collect()
}

#[test]
fn loop_is_unrolled() {
    let options = ExportOptions { loop_count: 2, ..ExportOptions::default() };
    let song = reimport(&four_bar_song(), &options);
    assert_eq!(song.bar_count, 6);
    assert_eq!(
        bar_pitches(&song, 0),
        vec![Some(24), Some(26), Some(28), Some(26), Some(28), Some(29)]
    );
    // repeated bars share patterns
    assert_eq!(song.channels[0].bars, vec![1, 2, 3, 2, 3, 4]);
    assert_eq!(song.channels[0].patterns.len(), 4);
}

#[test]
fn intro_and_outro_can_be_dropped() {
    let options = ExportOptions { include_intro: false, include_outro: false, loop_count: 1 };
    let song = reimport(&four_bar_song(), &options);
    assert_eq!(song.bar_count, 2);
    assert_eq!(bar_pitches(&song, 0), vec![Some(26), Some(28)]);
    assert_eq!((song.loop_start, song.loop_length), (0, 2));
}

#[test]
fn chords_and_noise_survive() {
    let mut song = four_bar_song();
    song.bar_count = 1;
    song.loop_start = 0;
    song.loop_length = 1;
    let mut chord = note(24);
    chord.pitches.push(28);
    chord.pitches.push(31);
    song.channels[0].patterns = vec![Pattern { notes: vec![chord], instrument: 0 }];
    song.channels[0].bars = vec![1];

    let mut noise = Channel::with_instrument(Instrument::new(InstrumentKind::Noise));
    noise.patterns.push(Pattern { notes: vec![Note::new(4, 0, 12, 3, false)], instrument: 0 });
    noise.bars = vec![1];
    song.channels.push(noise);
    song.noise_channel_count = 1;

    let imported = reimport(&song, &ExportOptions::default());
    assert_eq!(imported.pitch_channel_count, 1);
    assert_eq!(imported.noise_channel_count, 1);

    let pitched = imported.get_pattern(0, 0).unwrap();
    assert_eq!(pitched.notes[0].pitches.as_slice(), &[24, 28, 31]);

    let noise = imported.get_pattern(1, 0).unwrap();
    assert_eq!(noise.notes[0].pitches.as_slice(), &[4]);
    assert_eq!((noise.notes[0].start, noise.notes[0].end), (0, 12));

    let features = analyze(&imported);
    assert_eq!(features.total_notes, 2);
    assert_eq!(features.chords, 1);
    assert_eq!(features.bends, 0);
}

#[test]
fn undo_restores_song_before_import() {
    let bytes = np_formats::export_midi(&four_bar_song(), &ExportOptions::default()).unwrap();
    let mut ctrl = Controller::new();
    ctrl.load_midi(&bytes).unwrap();
    ctrl.load_midi(&bytes).unwrap();
    let imported = ctrl.song().clone();

    assert!(ctrl.undo());
    assert_eq!(ctrl.song(), &imported);
    assert!(ctrl.undo());
    assert_eq!(ctrl.song(), &Song::default());
}
