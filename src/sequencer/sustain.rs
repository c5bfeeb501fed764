// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sustain pedal emulation.
//!
//! Tracks the damper pedal per channel and holds back Note Offs while it is
//! down, releasing them in arrival order when the pedal comes up.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::active_notes::ActiveNote;
use crate::midi::messages;

/// Who is responsible for holding notes while the pedal is down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SustainMode {
    /// Withhold Note Offs here and send synthetic pedal messages
    #[default]
    Emulated,
    /// Forward CC#64 verbatim and let the device sustain
    Device,
}

/// Pedal position for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PedalState {
    Released,
    Depressed,
}

/// Result of feeding a CC#64 value to the pedal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PedalChange {
    /// State did not change, nothing to send
    Unchanged,
    /// Pedal went down: send pedal-on
    Pressed,
    /// Pedal came up: send pedal-off, then these Note Offs in order
    Released(Vec<ActiveNote>),
}

/// Per-channel pedal state and withheld Note Offs
#[derive(Debug, Clone)]
pub struct SustainPedal {
    mode: SustainMode,
    depressed: [bool; messages::CHANNELS as usize],
    withheld: Vec<VecDeque<ActiveNote>>,
}

impl SustainPedal {
    pub fn new(mode: SustainMode) -> Self {
        Self {
            mode,
            depressed: [false; messages::CHANNELS as usize],
            withheld: vec![VecDeque::new(); messages::CHANNELS as usize],
        }
    }

    pub fn mode(&self) -> SustainMode {
        self.mode
    }

    pub fn state(&self, channel: u8) -> PedalState {
        if self.is_depressed(channel) {
            PedalState::Depressed
        } else {
            PedalState::Released
        }
    }

    pub fn is_depressed(&self, channel: u8) -> bool {
        self.depressed
            .get(channel as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Apply a sustain controller value on `channel`
    pub fn controller(&mut self, channel: u8, value: u8) -> PedalChange {
        let Some(slot) = self.depressed.get_mut(channel as usize) else {
            return PedalChange::Unchanged;
        };

        let down = value >= messages::PEDAL_THRESHOLD;
        if down == *slot {
            return PedalChange::Unchanged;
        }
        *slot = down;

        if down {
            PedalChange::Pressed
        } else {
            PedalChange::Released(self.withheld[channel as usize].drain(..).collect())
        }
    }

    /// Hold back a Note Off if the pedal on its channel is down.
    ///
    /// Returns `false` when the note should be released immediately.
    pub fn withhold(&mut self, note: ActiveNote) -> bool {
        if self.mode != SustainMode::Emulated || !self.is_depressed(note.channel) {
            return false;
        }
        self.withheld[note.channel as usize].push_back(note);
        true
    }

    /// Drop a withheld Note Off because the key was struck again
    pub fn cancel(&mut self, channel: u8, key: u8) {
        if let Some(queue) = self.withheld.get_mut(channel as usize) {
            queue.retain(|n| n.key != key);
        }
    }

    /// Force every channel to Released without flushing withheld notes.
    ///
    /// Withheld notes stay queued for the next natural release.
    pub fn disable(&mut self) {
        self.depressed = [false; messages::CHANNELS as usize];
    }

    /// Forget all withheld Note Offs
    pub fn clear_withheld(&mut self) {
        for queue in &mut self.withheld {
            queue.clear();
        }
    }

    pub fn withheld_count(&self) -> usize {
        self.withheld.iter().map(VecDeque::len).sum()
    }

    /// Whether any channel currently has the pedal down
    pub fn any_depressed(&self) -> bool {
        self.depressed.iter().any(|&d| d)
    }
}

impl Default for SustainPedal {
    fn default() -> Self {
        Self::new(SustainMode::default())
    }
}
