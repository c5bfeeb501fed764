// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! midir backend.
//!
//! This module provides a cross-platform implementation of the `MidiOutput`
//! trait, connecting to a port (typically a virtual loopback port such as
//! loopMIDI) selected by its exact name.

use anyhow::{anyhow, Result};
use midir::{MidiOutput as MidirPorts, MidiOutputConnection};
use tracing::info;

use super::MidiOutput;
use crate::error::PlaybackError;

const CLIENT_NAME: &str = "smfplay";

/// Output connection to a single midir port.
pub struct MidirOutput {
    connection: Option<MidiOutputConnection>,
    port_name: String,
}

impl MidirOutput {
    /// Connect to the output port whose name equals `name`.
    ///
    /// # Returns
    /// * `Ok(MidirOutput)` on success
    /// * `Err(PlaybackError::DeviceNotFound)` if no port has that name
    pub fn connect_by_name(name: &str) -> std::result::Result<Self, PlaybackError> {
        let midi_out = MidirPorts::new(CLIENT_NAME)
            .map_err(|e| PlaybackError::Output(format!("Failed to create MIDI client: {}", e)))?;

        let ports = midi_out.ports();
        let port = ports
            .iter()
            .find(|port| {
                midi_out
                    .port_name(port)
                    .map(|port_name| port_name == name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| PlaybackError::DeviceNotFound(name.to_string()))?;

        let connection = midi_out
            .connect(port, "smfplay-out")
            .map_err(|e| PlaybackError::Output(format!("Failed to connect to '{}': {}", name, e)))?;

        info!(port = name, "connected to MIDI output");

        Ok(Self {
            connection: Some(connection),
            port_name: name.to_string(),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiOutput for MidirOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| anyhow!("MIDI output '{}' is closed", self.port_name))?;
        connection
            .send(message)
            .map_err(|e| anyhow!("Failed to send MIDI message: {}", e))
    }

    fn dispose(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.close();
            info!(port = %self.port_name, "MIDI output closed");
        }
        Ok(())
    }
}

impl Drop for MidirOutput {
    fn drop(&mut self) {
        let _ = self.dispose();
    }
}

/// List all available MIDI output ports.
///
/// # Returns
/// A vector of (index, name) tuples.
pub fn list_destinations() -> Result<Vec<(usize, String)>> {
    let midi_out =
        MidirPorts::new(CLIENT_NAME).map_err(|e| anyhow!("Failed to create MIDI client: {}", e))?;

    let result = midi_out
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let name = midi_out
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            (i, name)
        })
        .collect();

    Ok(result)
}

/// Print all available MIDI output ports to stdout.
pub fn print_destinations() -> Result<()> {
    let destinations = list_destinations()?;
    if destinations.is_empty() {
        println!("No MIDI destinations found.");
    } else {
        println!("Available MIDI destinations:");
        for (i, name) in destinations {
            println!("  {}: {}", i, name);
        }
    }
    Ok(())
}
