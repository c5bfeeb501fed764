// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! File-level entry point: load, connect, play.

use std::path::Path;
use std::sync::Arc;

use tracing::info;
#[cfg(not(feature = "device"))]
use tracing::warn;

use super::engine::PlaybackOptions;
use super::sequence::Sequence;
use super::session::PlaybackSession;
use super::status::PlaybackReport;
use super::timeline::Timeline;
use crate::error::Result;
#[cfg(not(feature = "device"))]
use crate::error::PlaybackError;
use crate::midi::{LogOutput, MidiOutput};

/// Where a session sends its messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// System MIDI port matched by exact name
    Device(String),
    /// Log messages instead of sending them
    DryRun,
}

/// Open the sink for `target`.
///
/// # Errors
/// `DeviceNotFound` if no port has the configured name, or if the crate was
/// built without the `device` feature.
pub fn connect(target: &OutputTarget) -> Result<Box<dyn MidiOutput>> {
    match target {
        OutputTarget::DryRun => Ok(Box::new(LogOutput::new("dry-run"))),
        #[cfg(feature = "device")]
        OutputTarget::Device(name) => Ok(Box::new(crate::midi::MidirOutput::connect_by_name(name)?)),
        #[cfg(not(feature = "device"))]
        OutputTarget::Device(name) => {
            warn!(device = %name, "built without device support");
            Err(PlaybackError::DeviceNotFound(name.clone()))
        }
    }
}

type Connector = Box<dyn Fn() -> Result<Box<dyn MidiOutput>> + Send + Sync>;

/// Plays one file at a time
pub struct Player {
    connector: Connector,
    options: PlaybackOptions,
    session: Option<PlaybackSession>,
}

impl Player {
    pub fn new(target: OutputTarget, options: PlaybackOptions) -> Self {
        Self::with_connector(move || connect(&target), options)
    }

    /// Use a custom sink factory, called once per song
    pub fn with_connector<F>(connector: F, options: PlaybackOptions) -> Self
    where
        F: Fn() -> Result<Box<dyn MidiOutput>> + Send + Sync + 'static,
    {
        Self {
            connector: Box::new(connector),
            options,
            session: None,
        }
    }

    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    /// Stop whatever is playing, then load and play `path`
    pub fn play_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&PlaybackSession> {
        self.stop();
        let path = path.as_ref();
        info!(file = %path.display(), "loading");
        let sequence = Sequence::load(path)?;
        self.play_sequence(&sequence)
    }

    pub fn play_sequence(&mut self, sequence: &Sequence) -> Result<&PlaybackSession> {
        self.stop();
        let timeline = Arc::new(Timeline::build(sequence)?);
        let output = (self.connector)()?;
        let session = PlaybackSession::start(timeline, output, self.options.clone())?;
        Ok(self.session.insert(session))
    }

    /// The current session, if one was started
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Stop the current session and wait for it to wind down
    pub fn stop(&mut self) -> Option<PlaybackReport> {
        let session = self.session.take()?;
        session.stop();
        Some(session.wait())
    }

    /// Wait for the current song to finish on its own
    pub fn wait(&mut self) -> Option<PlaybackReport> {
        self.session.take().map(PlaybackSession::wait)
    }
}
