// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Parsed Standard MIDI File contents.
//!
//! A [`Sequence`] is the boundary between file parsing (done by `midly`) and
//! the scheduler, which only ever sees tracks of delta-tagged events.

use std::fs;
use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use tracing::debug;

use super::event::{EventKind, MetaEvent};
use crate::error::{PlaybackError, Result};

/// A single event with its delta time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    /// Ticks since the previous event on the same track
    pub delta: u32,
    pub kind: EventKind,
}

impl TrackEvent {
    pub fn new(delta: u32, kind: EventKind) -> Self {
        Self { delta, kind }
    }
}

/// One track of delta-tagged events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    pub events: Vec<TrackEvent>,
}

impl Track {
    pub fn new(events: Vec<TrackEvent>) -> Self {
        Self { events }
    }

    /// Total ticks covered by this track
    pub fn length_ticks(&self) -> u64 {
        self.events.iter().map(|e| e.delta as u64).sum()
    }

    pub fn ends_with_end_of_track(&self) -> bool {
        self.events
            .last()
            .map(|e| e.kind.is_end_of_track())
            .unwrap_or(false)
    }
}

/// Tracks plus the ticks-per-quarter-note division from the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// Ticks per quarter note; non-positive values are rejected by the timeline
    pub division: i32,
    pub tracks: Vec<Track>,
}

impl Sequence {
    pub fn new(division: i32, tracks: Vec<Track>) -> Self {
        Self { division, tracks }
    }

    /// Load a Standard MIDI File from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        debug!(path = ?path.as_ref(), bytes = data.len(), "read MIDI file");
        Self::from_bytes(&data)
    }

    /// Parse Standard MIDI File bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let smf = Smf::parse(data).map_err(|e| PlaybackError::MalformedFile(e.to_string()))?;

        let division = match smf.header.timing {
            Timing::Metrical(ticks) => ticks.as_int() as i32,
            Timing::Timecode(fps, subframe) => {
                return Err(PlaybackError::MalformedFile(format!(
                    "SMPTE timecode division ({} fps, {} subframes) is not supported",
                    fps.as_int(),
                    subframe
                )))
            }
        };

        let tracks = smf
            .tracks
            .iter()
            .map(|track| {
                Track::new(
                    track
                        .iter()
                        .map(|event| TrackEvent::new(event.delta.as_int(), convert(&event.kind)))
                        .collect(),
                )
            })
            .collect();

        Ok(Self { division, tracks })
    }

    /// Length of the longest track in ticks
    pub fn length_ticks(&self) -> u64 {
        self.tracks.iter().map(Track::length_ticks).max().unwrap_or(0)
    }

    /// First tempo event on any track, if any
    pub fn initial_tempo(&self) -> Option<u32> {
        self.tracks.iter().find_map(|track| {
            track.events.iter().find_map(|e| match e.kind {
                EventKind::Tempo(t) => Some(t),
                _ => None,
            })
        })
    }

    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(|t| t.events.len()).sum()
    }
}

fn convert(kind: &TrackEventKind<'_>) -> EventKind {
    match *kind {
        TrackEventKind::Midi { channel, message } => {
            let channel = channel.as_int();
            match message {
                MidiMessage::NoteOn { key, vel } => {
                    EventKind::note_on(channel, key.as_int(), vel.as_int())
                }
                MidiMessage::NoteOff { key, vel } => EventKind::NoteOff {
                    channel,
                    key: key.as_int(),
                    velocity: vel.as_int(),
                },
                MidiMessage::Controller { controller, value } => {
                    EventKind::control_change(channel, controller.as_int(), value.as_int())
                }
                _ => EventKind::Other,
            }
        }
        TrackEventKind::Meta(meta) => match meta {
            MetaMessage::Tempo(tempo) => EventKind::Tempo(tempo.as_int()),
            MetaMessage::KeySignature(sharps, minor) => {
                EventKind::Meta(MetaEvent::KeySignature { sharps, minor })
            }
            MetaMessage::TimeSignature(numerator, denominator_pow, _, _) => {
                EventKind::Meta(MetaEvent::TimeSignature {
                    numerator,
                    denominator_pow,
                })
            }
            MetaMessage::Lyric(text) => {
                EventKind::Meta(MetaEvent::Lyric(String::from_utf8_lossy(text).into_owned()))
            }
            MetaMessage::EndOfTrack => EventKind::end_of_track(),
            _ => EventKind::Meta(MetaEvent::Other),
        },
        TrackEventKind::SysEx(_) | TrackEventKind::Escape(_) => EventKind::Other,
    }
}
