// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sinks that do not need a MIDI device.
//!
//! `LogOutput` traces every message (used for `--dry-run`), and
//! `RecordingOutput` keeps them in memory so a test can inspect what a
//! session sent after handing its sink to the playback thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tracing::debug;

use super::{MidiMessage, MidiOutput};

/// Dry-run sink that logs each message at debug level
#[derive(Debug)]
pub struct LogOutput {
    name: String,
    sent: u64,
    disposed: bool,
}

impl LogOutput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: 0,
            disposed: false,
        }
    }

    /// Number of messages sent so far
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl MidiOutput for LogOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        if self.disposed {
            return Err(anyhow!("output '{}' already disposed", self.name));
        }
        self.sent += 1;
        match MidiMessage::parse(message) {
            Some(msg) => debug!(output = %self.name, "{}", msg),
            None => debug!(output = %self.name, "empty message"),
        }
        Ok(())
    }

    fn dispose(&mut self) -> Result<()> {
        self.disposed = true;
        debug!(output = %self.name, sent = self.sent, "output disposed");
        Ok(())
    }
}

/// A message captured by [`RecordingOutput`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMessage {
    /// Time since the recorder was created
    pub at: Duration,
    /// Raw bytes as sent
    pub bytes: Vec<u8>,
}

impl RecordedMessage {
    pub fn parsed(&self) -> Option<MidiMessage> {
        MidiMessage::parse(&self.bytes)
    }
}

/// In-memory sink. Clones share the same log.
#[derive(Debug, Clone)]
pub struct RecordingOutput {
    log: Arc<Mutex<Vec<RecordedMessage>>>,
    disposed: Arc<AtomicBool>,
    origin: Instant,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            disposed: Arc::new(AtomicBool::new(false)),
            origin: Instant::now(),
        }
    }

    /// All recorded messages with their timestamps
    pub fn recorded(&self) -> Vec<RecordedMessage> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Raw bytes of every recorded message
    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.recorded().into_iter().map(|m| m.bytes).collect()
    }

    /// Parsed form of every recorded message
    pub fn parsed(&self) -> Vec<MidiMessage> {
        self.recorded().iter().filter_map(RecordedMessage::parsed).collect()
    }

    pub fn len(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Box a clone for handing to a session while keeping this handle
    pub fn boxed(&self) -> Box<dyn MidiOutput> {
        Box::new(self.clone())
    }
}

impl Default for RecordingOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiOutput for RecordingOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        if self.is_disposed() {
            return Err(anyhow!("recording output already disposed"));
        }
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedMessage {
                at: self.origin.elapsed(),
                bytes: message.to_vec(),
            });
        Ok(())
    }

    fn dispose(&mut self) -> Result<()> {
        self.disposed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
