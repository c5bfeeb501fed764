// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tempo tracking.
//!
//! Converts tick distances to wall-clock time using the file's fixed
//! division and the running tempo (microseconds per quarter note).

use std::time::Duration;

use crate::error::PlaybackError;

/// Default tempo: 500,000 µs per quarter note = 120 BPM
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Running tempo plus the fixed ticks-per-quarter-note division
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoMap {
    /// Ticks per quarter note, fixed for the session
    division: u32,
    /// Microseconds per quarter note
    tempo_micros: u32,
}

impl TempoMap {
    /// Create a tempo map at the default tempo.
    ///
    /// A zero division is treated as one tick per quarter note; the timeline
    /// builder rejects such files before a session starts.
    pub fn new(division: u32) -> Self {
        Self {
            division: division.max(1),
            tempo_micros: DEFAULT_TEMPO,
        }
    }

    pub fn division(&self) -> u32 {
        self.division
    }

    /// Current tempo in microseconds per quarter note
    pub fn tempo_micros(&self) -> u32 {
        self.tempo_micros
    }

    /// Current tempo in beats per minute
    pub fn bpm(&self) -> f64 {
        60_000_000.0 / self.tempo_micros as f64
    }

    /// Replace the running tempo.
    ///
    /// Zero is coerced to [`DEFAULT_TEMPO`]; the tempo is already reset when
    /// `ZeroTempo` is returned so the caller only has to report it.
    pub fn set_tempo(&mut self, tempo_micros: u32) -> Result<(), PlaybackError> {
        if tempo_micros == 0 {
            self.tempo_micros = DEFAULT_TEMPO;
            return Err(PlaybackError::ZeroTempo);
        }
        self.tempo_micros = tempo_micros;
        Ok(())
    }

    /// Microseconds per tick at the current tempo
    pub fn micros_per_tick(&self) -> f64 {
        self.tempo_micros as f64 / self.division as f64
    }

    /// Convert a tick distance to milliseconds at the current tempo
    pub fn ticks_to_millis(&self, ticks: u64) -> f64 {
        ticks as f64 * self.micros_per_tick() / 1000.0
    }

    /// Wall-clock wait for a tick distance at the given playback speed.
    ///
    /// Non-positive or non-finite speeds are treated as 1.0. Waits too long
    /// to represent saturate at `Duration::MAX`.
    pub fn ticks_to_duration(&self, ticks: u64, speed: f64) -> Duration {
        let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
        let millis = self.ticks_to_millis(ticks) / speed;
        Duration::try_from_secs_f64((millis / 1000.0).max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Convert milliseconds to ticks at the current tempo (used for seeking)
    pub fn millis_to_ticks(&self, millis: u64) -> u64 {
        let seconds = millis as f64 / 1000.0;
        let ticks_per_second = self.division as f64 * (1_000_000.0 / self.tempo_micros as f64);
        (seconds * ticks_per_second) as u64
    }

    /// Seconds covered by a tick position at the current tempo
    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        ticks as f64 / (self.division as f64 * (1_000_000.0 / self.tempo_micros as f64))
    }

    /// Format a tick position as `mm:ss` at the current tempo
    pub fn format_position(&self, ticks: u64) -> String {
        let total = self.ticks_to_seconds(ticks) as u64;
        format!("{:02}:{:02}", total / 60, total % 60)
    }
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::new(480)
    }
}
