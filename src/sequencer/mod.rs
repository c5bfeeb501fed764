// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sequencer core for scheduling and playing MIDI files.
//!
//! This module provides the playback infrastructure:
//! - Parsed tracks and an absolute-tick timeline
//! - Active-note registry and sustain pedal emulation
//! - A playback engine walking the timeline in real time
//! - Sessions with thread-safe transport controls

pub mod active_notes;
pub mod engine;
pub mod event;
pub mod player;
pub mod sequence;
pub mod session;
pub mod status;
pub mod sustain;
pub mod timeline;

pub use active_notes::{ActiveNote, ActiveNotes};
pub use engine::{PlaybackEngine, PlaybackOptions, SeekDirection, Step};
pub use event::{Event, EventKind, MetaEvent};
pub use player::{connect, OutputTarget, Player};
pub use sequence::{Sequence, Track, TrackEvent};
pub use session::PlaybackSession;
pub use status::{PlaybackReport, PlaybackState, PlaybackStatus};
pub use sustain::{PedalChange, PedalState, SustainMode, SustainPedal};
pub use timeline::Timeline;
