// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for SMFPLAY
//!
//! These tests drive whole playback sessions against a recording output and
//! check what reached the device.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage as SmfMessage, Smf, Timing, TrackEventKind};
use tempfile::tempdir;

use smfplay::config::PlayerConfig;
use smfplay::midi::{MidiMessage, RecordingOutput};
use smfplay::sequencer::{
    EventKind, OutputTarget, PlaybackOptions, PlaybackSession, PlaybackState, Player,
    SeekDirection, Sequence, Timeline, Track, TrackEvent,
};
use smfplay::PlaybackError;

// ============================================================================
// Helpers
// ============================================================================

type SmfTrack = Vec<midly::TrackEvent<'static>>;

fn ev(delta: u32, kind: TrackEventKind<'static>) -> midly::TrackEvent<'static> {
    midly::TrackEvent {
        delta: u28::new(delta),
        kind,
    }
}

fn midi(channel: u8, message: SmfMessage) -> TrackEventKind<'static> {
    TrackEventKind::Midi {
        channel: u4::new(channel),
        message,
    }
}

fn on(channel: u8, key: u8, vel: u8) -> TrackEventKind<'static> {
    midi(
        channel,
        SmfMessage::NoteOn {
            key: u7::new(key),
            vel: u7::new(vel),
        },
    )
}

fn off(channel: u8, key: u8) -> TrackEventKind<'static> {
    midi(
        channel,
        SmfMessage::NoteOff {
            key: u7::new(key),
            vel: u7::new(0),
        },
    )
}

fn cc(channel: u8, controller: u8, value: u8) -> TrackEventKind<'static> {
    midi(
        channel,
        SmfMessage::Controller {
            controller: u7::new(controller),
            value: u7::new(value),
        },
    )
}

fn tempo(micros: u32) -> TrackEventKind<'static> {
    TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros)))
}

fn end() -> TrackEventKind<'static> {
    TrackEventKind::Meta(MetaMessage::EndOfTrack)
}

/// Write a format-1 file with 96 ticks per quarter note
fn write_song(dir: &Path, name: &str, tracks: Vec<SmfTrack>) -> PathBuf {
    let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(u15::new(96))));
    smf.tracks = tracks;
    let path = dir.join(name);
    smf.save(&path).unwrap();
    path
}

fn recording_player(options: PlaybackOptions) -> (Player, RecordingOutput) {
    let recorder = RecordingOutput::new();
    let sink = recorder.clone();
    let player = Player::with_connector(move || Ok(sink.boxed()), options);
    (player, recorder)
}

/// Notes that got a Note On and were never silenced
fn stuck_notes(recorder: &RecordingOutput) -> Vec<(u8, u8)> {
    let mut sounding: HashMap<(u8, u8), i32> = HashMap::new();
    for message in recorder.parsed() {
        match message {
            MidiMessage::NoteOn { channel, note, .. } => {
                *sounding.entry((channel, note)).or_default() += 1
            }
            MidiMessage::NoteOff { channel, note, .. } => {
                *sounding.entry((channel, note)).or_default() -= 1
            }
            _ => {}
        }
    }
    let mut stuck: Vec<(u8, u8)> = sounding
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(note, _)| note)
        .collect();
    stuck.sort();
    stuck
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for playback");
        thread::sleep(Duration::from_millis(2));
    }
}

/// A 20 second chord on channels 0 and 1
fn long_chord() -> Vec<SmfTrack> {
    let length = 96 * 40;
    vec![
        vec![
            ev(0, tempo(500_000)),
            ev(0, on(0, 60, 100)),
            ev(0, on(0, 64, 100)),
            ev(length, off(0, 60)),
            ev(0, off(0, 64)),
            ev(0, end()),
        ],
        vec![
            ev(0, on(1, 48, 90)),
            ev(length, off(1, 48)),
            ev(0, end()),
        ],
    ]
}

// ============================================================================
// File to device
// ============================================================================

#[test]
fn test_file_plays_to_completion() {
    let dir = tempdir().unwrap();
    let path = write_song(
        dir.path(),
        "scale.mid",
        vec![vec![
            ev(0, tempo(100_000)),
            ev(0, on(0, 60, 100)),
            ev(24, off(0, 60)),
            ev(0, on(0, 62, 100)),
            ev(24, off(0, 62)),
            ev(0, on(0, 64, 100)),
            ev(24, off(0, 64)),
            ev(0, end()),
        ]],
    );

    let (mut player, recorder) = recording_player(PlaybackOptions::default());
    player.play_file(&path).unwrap();
    let report = player.wait().unwrap();

    assert!(report.completed);
    assert_eq!(report.final_tick, 72);
    assert_eq!(
        recorder.messages(),
        vec![
            vec![0x90, 60, 100],
            vec![0x80, 60, 0],
            vec![0x90, 62, 100],
            vec![0x80, 62, 0],
            vec![0x90, 64, 100],
            vec![0x80, 64, 0],
        ]
    );
    assert!(recorder.is_disposed());
}

#[test]
fn test_playback_follows_tempo_map() {
    let dir = tempdir().unwrap();
    // 96 ticks at 200 ms per quarter, then 96 ticks at 100 ms per quarter
    let path = write_song(
        dir.path(),
        "tempo.mid",
        vec![vec![
            ev(0, tempo(200_000)),
            ev(0, on(0, 60, 100)),
            ev(96, tempo(100_000)),
            ev(96, off(0, 60)),
            ev(0, end()),
        ]],
    );

    let (mut player, recorder) = recording_player(PlaybackOptions::default());
    player.play_file(&path).unwrap();
    player.wait().unwrap();

    let recorded = recorder.recorded();
    assert_eq!(recorded.len(), 2);
    let gap = recorded[1].at.saturating_sub(recorded[0].at);
    assert!(gap >= Duration::from_millis(290), "gap was {:?}", gap);
    assert!(gap < Duration::from_millis(600), "gap was {:?}", gap);
}

#[test]
fn test_speed_option_scales_waits() {
    let dir = tempdir().unwrap();
    let path = write_song(
        dir.path(),
        "speed.mid",
        vec![vec![
            ev(0, tempo(400_000)),
            ev(0, on(0, 60, 100)),
            ev(96, off(0, 60)),
            ev(0, end()),
        ]],
    );

    let options = PlaybackOptions {
        initial_speed: 4.0,
        ..PlaybackOptions::default()
    };
    let (mut player, _recorder) = recording_player(options);
    let started = Instant::now();
    player.play_file(&path).unwrap();
    player.wait().unwrap();

    // 400 ms of music at 4x
    assert!(started.elapsed() < Duration::from_millis(350));
}

#[test]
fn test_zero_tempo_falls_back_to_default() {
    let sequence = Sequence::new(
        96,
        vec![Track::new(vec![
            TrackEvent::new(0, EventKind::Tempo(0)),
            TrackEvent::new(0, EventKind::note_on(0, 60, 100)),
            TrackEvent::new(1, EventKind::note_off(0, 60)),
            TrackEvent::new(0, EventKind::end_of_track()),
        ])],
    );
    let recorder = RecordingOutput::new();
    let session = PlaybackSession::start(
        Arc::new(Timeline::build(&sequence).unwrap()),
        recorder.boxed(),
        PlaybackOptions::default(),
    )
    .unwrap();

    wait_until(|| session.is_finished());
    assert!((session.status().tempo_bpm - 120.0).abs() < 1e-9);
    assert_eq!(session.status().state, PlaybackState::Ended);
    assert!(session.wait().completed);
}

#[test]
fn test_malformed_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.mid");
    std::fs::write(&path, b"MThd this is not a midi file").unwrap();

    let (mut player, recorder) = recording_player(PlaybackOptions::default());
    let err = player.play_file(&path).unwrap_err();
    assert!(matches!(err, PlaybackError::MalformedFile(_)));
    assert!(player.session().is_none());
    assert!(recorder.is_empty());
}

#[test]
fn test_missing_file_is_io_error() {
    let (mut player, _) = recording_player(PlaybackOptions::default());
    let err = player.play_file("/nonexistent/song.mid").unwrap_err();
    assert!(matches!(err, PlaybackError::Io(_)));
}

#[cfg(not(feature = "device"))]
#[test]
fn test_named_device_not_found() {
    let dir = tempdir().unwrap();
    let path = write_song(dir.path(), "short.mid", vec![vec![ev(0, end())]]);

    let mut player = Player::new(
        OutputTarget::Device("No Such Port".to_string()),
        PlaybackOptions::default(),
    );
    let err = player.play_file(&path).unwrap_err();
    assert!(matches!(err, PlaybackError::DeviceNotFound(ref name) if name == "No Such Port"));
}

#[test]
fn test_dry_run_output() {
    let dir = tempdir().unwrap();
    let path = write_song(
        dir.path(),
        "dry.mid",
        vec![vec![
            ev(0, tempo(100_000)),
            ev(0, on(0, 60, 100)),
            ev(12, off(0, 60)),
            ev(0, end()),
        ]],
    );

    let mut player = Player::new(OutputTarget::DryRun, PlaybackOptions::default());
    player.play_file(&path).unwrap();
    let report = player.wait().unwrap();
    assert!(report.completed);
    assert_eq!(report.messages_sent, 2);
}

// ============================================================================
// Transport
// ============================================================================

#[test]
fn test_no_stuck_notes_after_transport() {
    let dir = tempdir().unwrap();
    let path = write_song(dir.path(), "chord.mid", long_chord());

    let (mut player, recorder) = recording_player(PlaybackOptions::default());
    player.play_file(&path).unwrap();
    wait_until(|| recorder.len() == 3);

    let session = player.session().unwrap();

    assert!(session.pause_resume());
    assert!(stuck_notes(&recorder).is_empty());
    assert!(!session.pause_resume());

    session.rewind();
    assert!(stuck_notes(&recorder).is_empty());

    // Seeking back to the start replays the chord
    assert_eq!(session.seek(60_000, SeekDirection::Backward), 0);
    wait_until(|| stuck_notes(&recorder).len() == 3);

    session.fast_forward();
    assert!(stuck_notes(&recorder).is_empty());

    player.stop().unwrap();
    assert!(stuck_notes(&recorder).is_empty());
    assert!(recorder.is_disposed());
}

#[test]
fn test_seek_clamping() {
    let dir = tempdir().unwrap();
    let path = write_song(dir.path(), "chord.mid", long_chord());

    let (mut player, recorder) = recording_player(PlaybackOptions::default());
    player.play_file(&path).unwrap();
    wait_until(|| recorder.len() == 3);

    let session = player.session().unwrap();
    session.pause_resume();

    assert_eq!(session.seek(60_000, SeekDirection::Backward), 0);
    assert_eq!(session.status().tick, 0);
    assert_eq!(session.status().state, PlaybackState::Paused);

    let last = session.status().last_tick;
    assert_eq!(last, 96 * 40);
    assert_eq!(session.seek(600_000, SeekDirection::Forward), last - 1);

    // 5 s at 120 BPM and 96 PPQN is 960 ticks
    assert_eq!(session.rewind(), last - 1 - 960);
    let report = player.stop().unwrap();
    assert!(!report.completed);
}

#[test]
fn test_stop_while_paused_returns() {
    let dir = tempdir().unwrap();
    let path = write_song(dir.path(), "chord.mid", long_chord());

    let (mut player, recorder) = recording_player(PlaybackOptions::default());
    player.play_file(&path).unwrap();
    wait_until(|| recorder.len() == 3);

    player.session().unwrap().pause_resume();
    let started = Instant::now();
    let report = player.stop().unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(report.notes_released, 3);
}

#[test]
fn test_speed_changes_are_inverse() {
    let dir = tempdir().unwrap();
    let path = write_song(dir.path(), "chord.mid", long_chord());

    let (mut player, _recorder) = recording_player(PlaybackOptions::default());
    player.play_file(&path).unwrap();
    let session = player.session().unwrap();

    let start = session.speed();
    session.increase_speed();
    session.decrease_speed();
    assert!((session.speed() - start).abs() < 1e-9);

    for _ in 0..50 {
        session.increase_speed();
    }
    for _ in 0..50 {
        session.decrease_speed();
    }
    assert!((session.speed() - start).abs() < 1e-9);

    for i in 0..500 {
        if i % 3 == 0 {
            session.increase_speed();
        } else {
            session.decrease_speed();
        }
        assert!(session.speed() > 0.0);
    }
    assert!(session.set_speed(-1.0).is_err());
    player.stop();
}

#[test]
fn test_play_file_replaces_running_song() {
    let dir = tempdir().unwrap();
    let first = write_song(dir.path(), "first.mid", long_chord());
    let second = write_song(
        dir.path(),
        "second.mid",
        vec![vec![
            ev(0, on(0, 72, 100)),
            ev(1, off(0, 72)),
            ev(0, end()),
        ]],
    );

    let outputs = Arc::new(Mutex::new(Vec::new()));
    let created = Arc::clone(&outputs);
    let mut player = Player::with_connector(
        move || {
            let recorder = RecordingOutput::new();
            created.lock().unwrap().push(recorder.clone());
            Ok(recorder.boxed())
        },
        PlaybackOptions::default(),
    );

    player.play_file(&first).unwrap();
    let first_output = outputs.lock().unwrap()[0].clone();
    wait_until(|| first_output.len() == 3);

    player.play_file(&second).unwrap();
    let report = player.wait().unwrap();
    assert!(report.completed);

    let outputs = outputs.lock().unwrap();
    assert_eq!(outputs.len(), 2);
    assert!(outputs[0].is_disposed());
    assert!(stuck_notes(&outputs[0]).is_empty());
    assert_eq!(
        outputs[1].messages(),
        vec![vec![0x90, 72, 100], vec![0x80, 72, 0]]
    );
}

// ============================================================================
// Sustain and percussion
// ============================================================================

#[test]
fn test_sustain_holds_note_off_until_pedal_up() {
    let dir = tempdir().unwrap();
    let path = write_song(
        dir.path(),
        "pedal.mid",
        vec![vec![
            ev(0, tempo(100_000)),
            ev(0, on(0, 60, 100)),
            ev(4, cc(0, 64, 127)),
            ev(4, off(0, 60)),
            ev(4, on(0, 67, 90)),
            ev(4, off(0, 67)),
            ev(4, cc(0, 64, 0)),
            ev(0, end()),
        ]],
    );

    let (mut player, recorder) = recording_player(PlaybackOptions::default());
    player.play_file(&path).unwrap();
    player.wait().unwrap();

    assert_eq!(
        recorder.messages(),
        vec![
            vec![0x90, 60, 100],
            vec![0xB0, 64, 127],
            vec![0x90, 67, 90],
            vec![0xB0, 64, 0],
            vec![0x80, 60, 0],
            vec![0x80, 67, 0],
        ]
    );
}

#[test]
fn test_percussion_channel_from_config() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("player.yaml");
    std::fs::write(&config_path, "playback:\n  percussion_from: 16\n").unwrap();
    let config = PlayerConfig::load(&config_path).unwrap();

    let path = write_song(
        dir.path(),
        "drums.mid",
        vec![vec![
            ev(0, on(9, 36, 120)),
            ev(1, on(9, 36, 110)),
            ev(1, end()),
        ]],
    );

    // Channel 10 is tracked like any other channel, so the re-strike is
    // preceded by a Note Off and the end of the song silences it
    let (mut player, recorder) = recording_player(config.playback_options());
    player.play_file(&path).unwrap();
    player.wait().unwrap();

    assert_eq!(
        recorder.messages(),
        vec![
            vec![0x99, 36, 120],
            vec![0x89, 36, 120],
            vec![0x99, 36, 110],
            vec![0x89, 36, 110],
        ]
    );
}

#[test]
fn test_default_percussion_is_not_tracked() {
    let dir = tempdir().unwrap();
    let path = write_song(
        dir.path(),
        "drums.mid",
        vec![vec![
            ev(0, on(9, 36, 120)),
            ev(1, on(9, 36, 110)),
            ev(1, end()),
        ]],
    );

    let (mut player, recorder) = recording_player(PlaybackOptions::default());
    player.play_file(&path).unwrap();
    let report = player.wait().unwrap();

    assert_eq!(recorder.messages(), vec![vec![0x99, 36, 120], vec![0x99, 36, 110]]);
    assert_eq!(report.notes_released, 0);
}

#[test]
fn test_invalid_control_change_is_skipped() {
    let sequence = Sequence::new(
        96,
        vec![Track::new(vec![
            TrackEvent::new(0, EventKind::control_change(0, 7, 200)),
            TrackEvent::new(0, EventKind::control_change(0, 7, 90)),
            TrackEvent::new(0, EventKind::end_of_track()),
        ])],
    );

    let (mut player, recorder) = recording_player(PlaybackOptions::default());
    player.play_sequence(&sequence).unwrap();
    let report = player.wait().unwrap();

    assert_eq!(recorder.messages(), vec![vec![0xB0, 7, 90]]);
    assert_eq!(report.invalid_controls, 1);
    assert!(report.completed);
}
