// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Control system for keyboard input.
//!
//! This module provides:
//! - Transport actions and how they reach a playback session
//! - Keyboard shortcut handling
//! - The interactive raw-mode console

pub mod console;
pub mod keyboard;

pub use console::Console;
pub use keyboard::{format_shortcut, parse_shortcut, KeyBinding, KeyboardController, Shortcut};

use std::path::PathBuf;

use tracing::debug;

use crate::error::Result;
use crate::sequencer::Player;

/// Action that can be triggered by controls
#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    // Transport
    /// Toggle pause/resume
    PauseResume,
    /// Seek forward one step
    FastForward,
    /// Seek backward one step
    Rewind,
    /// End the current song and return to the menu
    EndSong,

    // Playback
    /// Multiply speed by the speed step
    IncreaseSpeed,
    /// Divide speed by the speed step
    DecreaseSpeed,
    /// Toggle humanized Note On timing
    ToggleLegitMode,
    /// Force the sustain pedal up on every channel
    DisableSustain,

    // Player
    /// Stop the current song and play a file
    PlayFile(PathBuf),
    /// Stop playback and leave the player
    Quit,
}

/// What the front end should do after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl ControlAction {
    /// Parse an action name as used in config files
    pub fn from_name(name: &str) -> Option<Self> {
        let action = match name.trim().to_ascii_lowercase().as_str() {
            "pause_resume" | "pause" => ControlAction::PauseResume,
            "fast_forward" => ControlAction::FastForward,
            "rewind" => ControlAction::Rewind,
            "end_song" | "exit_to_menu" | "stop" => ControlAction::EndSong,
            "increase_speed" => ControlAction::IncreaseSpeed,
            "decrease_speed" => ControlAction::DecreaseSpeed,
            "toggle_legit_mode" | "legit_mode" => ControlAction::ToggleLegitMode,
            "disable_sustain" => ControlAction::DisableSustain,
            "quit" => ControlAction::Quit,
            _ => return None,
        };
        Some(action)
    }

    /// Canonical config name
    pub fn name(&self) -> &'static str {
        match self {
            ControlAction::PauseResume => "pause_resume",
            ControlAction::FastForward => "fast_forward",
            ControlAction::Rewind => "rewind",
            ControlAction::EndSong => "end_song",
            ControlAction::IncreaseSpeed => "increase_speed",
            ControlAction::DecreaseSpeed => "decrease_speed",
            ControlAction::ToggleLegitMode => "toggle_legit_mode",
            ControlAction::DisableSustain => "disable_sustain",
            ControlAction::PlayFile(_) => "play_file",
            ControlAction::Quit => "quit",
        }
    }

    /// Run the action against the player's current session.
    ///
    /// Session actions are no-ops when nothing is playing.
    pub fn apply(&self, player: &mut Player) -> Result<Flow> {
        debug!(action = self.name(), "control action");

        match self {
            ControlAction::PlayFile(path) => {
                player.play_file(path)?;
                return Ok(Flow::Continue);
            }
            ControlAction::Quit => {
                player.stop();
                return Ok(Flow::Quit);
            }
            _ => {}
        }

        let Some(session) = player.session() else {
            return Ok(Flow::Continue);
        };
        match self {
            ControlAction::PauseResume => {
                session.pause_resume();
            }
            ControlAction::FastForward => {
                session.fast_forward();
            }
            ControlAction::Rewind => {
                session.rewind();
            }
            ControlAction::EndSong => session.stop(),
            ControlAction::IncreaseSpeed => {
                session.increase_speed();
            }
            ControlAction::DecreaseSpeed => {
                session.decrease_speed();
            }
            ControlAction::ToggleLegitMode => {
                session.toggle_legit_mode();
            }
            ControlAction::DisableSustain => session.disable_sustain(),
            ControlAction::PlayFile(_) | ControlAction::Quit => {}
        }
        Ok(Flow::Continue)
    }
}
