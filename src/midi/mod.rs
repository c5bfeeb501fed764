// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI output abstraction layer.
//!
//! This module provides a trait-based abstraction for the device sink a
//! playback session writes to, allowing a real port (midir), a dry-run
//! logger, or an in-memory recorder to be used interchangeably.

pub mod message;
#[cfg(feature = "device")]
pub mod midir_backend;
pub mod virtual_output;

use anyhow::Result;

pub use message::MidiMessage;
#[cfg(feature = "device")]
pub use midir_backend::{list_destinations, print_destinations, MidirOutput};
pub use virtual_output::{LogOutput, RecordedMessage, RecordingOutput};

/// Trait for MIDI output implementations.
///
/// A sink is owned exclusively by one playback session. Only the playback
/// loop and the transport operations write to it.
pub trait MidiOutput: Send {
    /// Send a MIDI message immediately.
    ///
    /// # Arguments
    /// * `message` - Raw MIDI bytes (e.g., `[0x90, 60, 127]` for Note On)
    fn send(&mut self, message: &[u8]) -> Result<()>;

    /// Release the underlying device. Sends after disposal fail.
    fn dispose(&mut self) -> Result<()> {
        Ok(())
    }
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_AFTERTOUCH: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_AFTERTOUCH: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;

    /// Sustain (damper) pedal controller number
    pub const SUSTAIN_PEDAL: u8 = 64;
    /// Controller values at or above this count as "pedal down"
    pub const PEDAL_THRESHOLD: u8 = 64;
    pub const PEDAL_ON: u8 = 127;
    pub const PEDAL_OFF: u8 = 0;

    /// Number of MIDI channels
    pub const CHANNELS: u8 = 16;

    pub fn note_on(channel: u8, key: u8, velocity: u8) -> [u8; 3] {
        [NOTE_ON | (channel & 0x0F), key, velocity]
    }

    pub fn note_off(channel: u8, key: u8, velocity: u8) -> [u8; 3] {
        [NOTE_OFF | (channel & 0x0F), key, velocity]
    }

    pub fn control_change(channel: u8, controller: u8, value: u8) -> [u8; 3] {
        [CONTROL_CHANGE | (channel & 0x0F), controller, value]
    }
}
