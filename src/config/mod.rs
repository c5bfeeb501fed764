// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration system for SMFPLAY.
//!
//! This module provides the player settings file: output device, transport
//! steps, sustain handling, logging and keyboard overrides.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::control::{parse_shortcut, ControlAction};
use crate::sequencer::active_notes::DEFAULT_PERCUSSION_FROM;
use crate::sequencer::{OutputTarget, PlaybackOptions, SustainMode};

/// Root player configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    /// Output device settings
    #[serde(default)]
    pub midi: MidiConfig,
    /// Transport and dispatch settings
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Keyboard overrides: key spec to action name
    #[serde(default)]
    pub keyboard: BTreeMap<String, String>,
}

impl PlayerConfig {
    /// Load a player configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse a player configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Check value ranges and keyboard overrides
    pub fn validate(&self) -> Result<()> {
        let playback = &self.playback;
        if !playback.speed_step.is_finite() || playback.speed_step <= 1.0 {
            bail!("speed_step must be greater than 1.0, got {}", playback.speed_step);
        }
        let [low, high] = playback.legit_delay_ms;
        if low > high {
            bail!("legit_delay_ms range is reversed: [{}, {}]", low, high);
        }
        if playback.percussion_from > 16 {
            bail!("percussion_from must be 0-16, got {}", playback.percussion_from);
        }
        tracing::Level::from_str(&self.logging.level)
            .map_err(|_| anyhow::anyhow!("Unknown log level: {}", self.logging.level))?;

        for (key, action) in &self.keyboard {
            parse_shortcut(key).with_context(|| format!("Invalid keyboard override '{}'", key))?;
            if ControlAction::from_name(action).is_none() {
                bail!("Unknown action '{}' for key '{}'", action, key);
            }
        }
        Ok(())
    }

    /// Runtime options handed to each playback session
    pub fn playback_options(&self) -> PlaybackOptions {
        let playback = &self.playback;
        PlaybackOptions {
            seek_step_ms: playback.seek_step_ms,
            speed_step: playback.speed_step,
            initial_speed: 1.0,
            sustain_mode: playback.sustain_mode,
            legit_mode: playback.legit_mode,
            legit_delay_ms: (playback.legit_delay_ms[0], playback.legit_delay_ms[1]),
            percussion_from: playback.percussion_from,
            seed: None,
        }
    }

    /// Output the player should open
    pub fn output_target(&self) -> OutputTarget {
        if self.midi.dry_run {
            OutputTarget::DryRun
        } else {
            OutputTarget::Device(self.midi.device.clone())
        }
    }
}

/// Output device settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MidiConfig {
    /// Exact name of the output port
    #[serde(default = "default_device")]
    pub device: String,
    /// Log messages instead of opening a device
    #[serde(default)]
    pub dry_run: bool,
}

fn default_device() -> String {
    "loopMIDI Port".to_string()
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            dry_run: false,
        }
    }
}

/// Transport and dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackConfig {
    /// Fast-forward/rewind distance in milliseconds
    #[serde(default = "default_seek_step")]
    pub seek_step_ms: u64,
    /// Factor for increase/decrease speed
    #[serde(default = "default_speed_step")]
    pub speed_step: f64,
    #[serde(default)]
    pub sustain_mode: SustainMode,
    /// Start with humanized Note On timing
    #[serde(default)]
    pub legit_mode: bool,
    /// Inclusive range of humanize delays
    #[serde(default = "default_legit_delay")]
    pub legit_delay_ms: [u64; 2],
    /// First percussion channel (0-based), 16 disables
    #[serde(default = "default_percussion_from")]
    pub percussion_from: u8,
}

fn default_seek_step() -> u64 {
    5000
}
fn default_speed_step() -> f64 {
    1.1
}
fn default_legit_delay() -> [u64; 2] {
    [5, 50]
}
fn default_percussion_from() -> u8 {
    DEFAULT_PERCUSSION_FROM
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            seek_step_ms: default_seek_step(),
            speed_step: default_speed_step(),
            sustain_mode: SustainMode::default(),
            legit_mode: false,
            legit_delay_ms: default_legit_delay(),
            percussion_from: default_percussion_from(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Minimum level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file used while the interactive console owns the terminal
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file() -> PathBuf {
    PathBuf::from("smfplay.log")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}
