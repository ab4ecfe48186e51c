use np_ir::config::{BAR_COUNT_MAX, CHROMATIC_SCALE, INSTRUMENTS_PER_CHANNEL_MAX};
use np_master::{Controller, ExportOptions, FormatError, Song};

fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// Format 1, 96 ticks per beat: 3/4 at 100 bpm in E minor, then two notes.
fn small_file() -> Vec<u8> {
    let meta: &[u8] = &[
        0x00, 0xFF, 0x51, 0x03, 0x09, 0x27, 0xC0, // 600000 us per beat
        0x00, 0xFF, 0x58, 0x04, 0x03, 0x02, 0x18, 0x08,
        0x00, 0xFF, 0x59, 0x02, 0x01, 0x01,
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let notes: &[u8] = &[
        0x00, 0x90, 64, 100, 0x60, 0x80, 64, 0,
        0x00, 0x90, 67, 100, 0x60, 0x80, 67, 0,
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let mut out = chunk(b"MThd", &[0x00, 0x01, 0x00, 0x02, 0x00, 0x60]);
    out.extend(chunk(b"MTrk", meta));
    out.extend(chunk(b"MTrk", notes));
    out
}

/// Format 0, 96 ticks per beat, default 8 beats per bar: 200 bars with one
/// note each, cycling through programs 0..20.
fn long_file() -> Vec<u8> {
    let mut track = Vec::new();
    for bar in 0..200u32 {
        // 672 ticks of rest after the previous note fills out the bar
        track.extend_from_slice(if bar == 0 { &[0x00][..] } else { &[0x85, 0x20][..] });
        track.extend_from_slice(&[0xC0, (bar % 20) as u8, 0x00, 0x90, 60, 100, 0x60, 0x80, 60, 0]);
    }
    track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    let mut out = chunk(b"MThd", &[0x00, 0x00, 0x00, 0x01, 0x00, 0x60]);
    out.extend(chunk(b"MTrk", &track));
    out
}

#[test]
fn load_commits_song_settings() {
    let mut controller = Controller::new();
    controller.load_midi(&small_file()).unwrap();
    let song = controller.song();
    assert_eq!(song.tempo, 100);
    assert_eq!(song.beats_per_bar, 3);
    // one sharp, minor: E
    assert_eq!(song.key, 4);
    assert_eq!(song.scale, CHROMATIC_SCALE);
    assert_eq!(song.pitch_channel_count, 1);
    assert_eq!(song.noise_channel_count, 0);
    assert_eq!(song.loop_start, 0);
    assert_eq!(song.loop_length, song.bar_count);
    assert!(song.channels.iter().all(|c| c.bars.len() == song.bar_count));
}

#[test]
fn import_is_one_undo_step() {
    let mut controller = Controller::new();
    let original = controller.song().clone();
    assert!(!controller.can_undo());

    controller.load_midi(&small_file()).unwrap();
    let imported = controller.song().clone();
    assert_ne!(imported, original);

    assert!(controller.undo());
    assert_eq!(controller.song(), &original);
    assert!(!controller.undo());

    assert!(controller.redo());
    assert_eq!(controller.song(), &imported);
    assert!(!controller.redo());
}

#[test]
fn failed_load_leaves_song_untouched() {
    let mut controller = Controller::new();
    let original = controller.song().clone();

    let mut broken = small_file();
    broken.truncate(30);
    assert!(controller.load_midi(&broken).is_err());
    assert!(matches!(controller.load_midi(b"not midi"), Err(FormatError::OutOfRange { .. })));

    assert_eq!(controller.song(), &original);
    assert!(!controller.can_undo());
}

#[test]
fn export_after_import() {
    let mut controller = Controller::new();
    controller.load_midi(&small_file()).unwrap();
    let bytes = controller.export_midi(&ExportOptions::default()).unwrap();
    assert_eq!(&bytes[..4], b"MThd");

    let mut again = Controller::new();
    again.load_midi(&bytes).unwrap();
    let (a, b) = (controller.song(), again.song());
    assert_eq!(a.tempo, b.tempo);
    assert_eq!(a.beats_per_bar, b.beats_per_bar);
    assert_eq!(a.key, b.key);
    assert_eq!(a.bar_count, b.bar_count);
    let notes = |song: &Song| -> Vec<(u32, u32, i32)> {
        song.channels[0]
            .patterns
            .iter()
            .flat_map(|p| p.notes.iter().map(|n| (n.start, n.end, n.pitches[0])))
            .collect()
    };
    assert_eq!(notes(a), notes(b));
}

#[test]
fn load_cuts_song_to_size_limits() {
    let mut controller = Controller::new();
    controller.load_midi(&long_file()).unwrap();
    let song = controller.song();
    assert_eq!(song.bar_count, BAR_COUNT_MAX);
    assert_eq!(song.loop_length, BAR_COUNT_MAX);

    let channel = &song.channels[0];
    assert_eq!(channel.bars.len(), BAR_COUNT_MAX);
    assert_eq!(channel.instruments.len(), INSTRUMENTS_PER_CHANNEL_MAX);
    // programs 10..20 fall back to instrument 0 and share its pattern
    assert_eq!(channel.patterns.len(), INSTRUMENTS_PER_CHANNEL_MAX);
    assert!(channel.patterns.iter().all(|p| p.instrument < channel.instruments.len()));
    assert!(channel.bars.iter().all(|&b| (1..=channel.patterns.len()).contains(&b)));
    assert_eq!(channel.bars[10], 1);
}
