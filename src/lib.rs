// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! SMFPLAY - real-time Standard MIDI File player.
//!
//! The crate is organised around the playback scheduler:
//! - [`sequencer`] builds the merged timeline and runs playback sessions
//! - [`timing`] converts ticks to wall-clock time under a tempo map
//! - [`midi`] abstracts the output device the session writes to
//! - [`control`] maps keyboard input to transport actions
//! - [`config`] loads player settings from YAML

pub mod config;
pub mod control;
pub mod error;
pub mod midi;
pub mod sequencer;
pub mod timing;

pub use error::{PlaybackError, Result};
pub use sequencer::{
    PlaybackOptions, PlaybackReport, PlaybackSession, PlaybackStatus, Player, SeekDirection,
    Sequence, Timeline,
};
