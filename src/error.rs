// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for loading and playing MIDI files.

use thiserror::Error;

/// Errors raised while setting up or running a playback session.
///
/// `MalformedFile` and `DeviceNotFound` abort session setup. The remaining
/// data errors are recovered inside the playback loop and only logged.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Malformed MIDI file: {0}")]
    MalformedFile(String),

    #[error("MIDI output device '{0}' not found")]
    DeviceNotFound(String),

    #[error("Invalid control change on channel {channel}: controller={controller}, value={value}")]
    InvalidControlValue { channel: u8, controller: u8, value: u8 },

    #[error("Tempo of zero microseconds per quarter note, falling back to default")]
    ZeroTempo,

    #[error("Invalid playback speed factor: {0}")]
    InvalidSpeed(f64),

    #[error("MIDI output error: {0}")]
    Output(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PlaybackError::DeviceNotFound("loopMIDI Port".to_string());
        assert_eq!(err.to_string(), "MIDI output device 'loopMIDI Port' not found");

        let err = PlaybackError::InvalidControlValue {
            channel: 0,
            controller: 200,
            value: 3,
        };
        assert!(err.to_string().contains("controller=200"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.mid");
        let err: PlaybackError = io.into();
        assert!(matches!(err, PlaybackError::Io(_)));
    }
}
