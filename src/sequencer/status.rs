// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Read-only playback status for display.

use std::fmt;
use std::time::Duration;

/// Playback state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Running,
    Paused,
    Seeking,
    Ended,
}

impl PlaybackState {
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Running => "PLAY",
            PlaybackState::Paused => "PAUSE",
            PlaybackState::Seeking => "SEEK",
            PlaybackState::Ended => "END",
        }
    }
}

/// Snapshot of what a front end shows while a song plays
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    /// Current tick
    pub tick: u64,
    /// Terminal tick of the song
    pub last_tick: u64,
    /// Current position as `mm:ss`
    pub position: String,
    /// Song length as `mm:ss`
    pub length: String,
    /// Tempo in BPM
    pub tempo_bpm: f64,
    /// Playback speed multiplier
    pub speed: f64,
    pub legit_mode: bool,
    pub key_signature: Option<String>,
    pub time_signature: Option<String>,
    pub lyrics: Option<String>,
    /// Number of notes currently sounding
    pub active_notes: usize,
    /// Last transport message, e.g. "Paused"
    pub message: Option<String>,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} / {} | {:.0} BPM | {:.2}x",
            self.state.label(),
            self.position,
            self.length,
            self.tempo_bpm,
            self.speed
        )?;
        if let Some(ref key) = self.key_signature {
            write!(f, " | {}", key)?;
        }
        if let Some(ref time) = self.time_signature {
            write!(f, " | {}", time)?;
        }
        if self.legit_mode {
            write!(f, " | legit")?;
        }
        if let Some(ref lyrics) = self.lyrics {
            write!(f, " | \"{}\"", lyrics)?;
        }
        if let Some(ref message) = self.message {
            write!(f, " | {}", message)?;
        }
        Ok(())
    }
}

/// Summary returned when a session ends
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackReport {
    /// Tick the session ended at
    pub final_tick: u64,
    /// True if the song ran to its last tick rather than being stopped
    pub completed: bool,
    /// Messages handed to the output
    pub messages_sent: u64,
    /// Note Offs sent by forced releases (pause, seek, stop, end)
    pub notes_released: u64,
    /// Control changes skipped for out-of-range data
    pub invalid_controls: u64,
    /// Messages the output failed to send
    pub send_errors: u64,
    pub elapsed: Duration,
}
