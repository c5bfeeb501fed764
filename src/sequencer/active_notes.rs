// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Registry of currently sounding notes.
//!
//! The registry does not talk to the output itself: it returns the notes
//! that must be silenced and the playback engine sends the Note Offs.

use std::collections::BTreeMap;

use crate::midi::messages;

/// First channel (0-based) treated as percussion by default
pub const DEFAULT_PERCUSSION_FROM: u8 = 9;

/// A note that has been sent a Note On and no Note Off yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveNote {
    pub channel: u8,
    pub key: u8,
    pub velocity: u8,
}

impl ActiveNote {
    pub fn new(channel: u8, key: u8, velocity: u8) -> Self {
        Self {
            channel,
            key,
            velocity,
        }
    }

    /// Note Off bytes silencing this note
    pub fn note_off(&self) -> [u8; 3] {
        messages::note_off(self.channel, self.key, self.velocity)
    }
}

/// Sounding notes grouped by channel, in registration order
#[derive(Debug, Clone)]
pub struct ActiveNotes {
    notes: BTreeMap<u8, Vec<ActiveNote>>,
    percussion_from: u8,
}

impl ActiveNotes {
    pub fn new() -> Self {
        Self::with_percussion_from(DEFAULT_PERCUSSION_FROM)
    }

    /// Channels `percussion_from..16` are treated as percussion.
    /// Pass 16 to track every channel.
    pub fn with_percussion_from(percussion_from: u8) -> Self {
        Self {
            notes: BTreeMap::new(),
            percussion_from,
        }
    }

    /// Percussion hits are fire-and-forget and never registered
    pub fn is_percussion(&self, channel: u8) -> bool {
        channel >= self.percussion_from && channel < messages::CHANNELS
    }

    /// Register a Note On.
    ///
    /// Returns the note already sounding on the same (channel, key), which the
    /// caller must silence before sending the new Note On. Percussion notes
    /// are not registered and never displace anything.
    pub fn note_on(&mut self, channel: u8, key: u8, velocity: u8) -> Option<ActiveNote> {
        if self.is_percussion(channel) {
            return None;
        }

        let channel_notes = self.notes.entry(channel).or_default();
        let existing = channel_notes.iter().position(|n| n.key == key);
        let displaced = existing.map(|index| channel_notes.remove(index));
        channel_notes.push(ActiveNote::new(channel, key, velocity));
        displaced
    }

    /// Remove and return the note sounding on (channel, key), if any
    pub fn note_off(&mut self, channel: u8, key: u8) -> Option<ActiveNote> {
        let channel_notes = self.notes.get_mut(&channel)?;
        let index = channel_notes.iter().position(|n| n.key == key)?;
        let note = channel_notes.remove(index);
        if channel_notes.is_empty() {
            self.notes.remove(&channel);
        }
        Some(note)
    }

    pub fn contains(&self, channel: u8, key: u8) -> bool {
        self.notes
            .get(&channel)
            .map(|notes| notes.iter().any(|n| n.key == key))
            .unwrap_or(false)
    }

    /// Take every sounding note, leaving the registry empty.
    ///
    /// Notes come out ordered by channel, then in registration order.
    pub fn release_all(&mut self) -> Vec<ActiveNote> {
        std::mem::take(&mut self.notes)
            .into_values()
            .flatten()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.notes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.values().all(Vec::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveNote> + '_ {
        self.notes.values().flatten()
    }
}

impl Default for ActiveNotes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_off() {
        let mut notes = ActiveNotes::new();
        assert!(notes.note_on(0, 60, 100).is_none());
        assert!(notes.contains(0, 60));
        assert_eq!(notes.len(), 1);

        let released = notes.note_off(0, 60).unwrap();
        assert_eq!(released, ActiveNote::new(0, 60, 100));
        assert!(notes.is_empty());
    }

    #[test]
    fn test_retrigger_returns_displaced_note() {
        let mut notes = ActiveNotes::new();
        notes.note_on(2, 64, 80);
        let displaced = notes.note_on(2, 64, 110);

        assert_eq!(displaced, Some(ActiveNote::new(2, 64, 80)));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes.iter().next().unwrap().velocity, 110);
    }

    #[test]
    fn test_note_off_for_unknown_note_is_noop() {
        let mut notes = ActiveNotes::new();
        notes.note_on(0, 60, 100);
        assert!(notes.note_off(0, 61).is_none());
        assert!(notes.note_off(1, 60).is_none());
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn test_release_all_is_idempotent() {
        let mut notes = ActiveNotes::new();
        notes.note_on(1, 62, 90);
        notes.note_on(0, 60, 100);
        notes.note_on(0, 67, 70);

        let released = notes.release_all();
        assert_eq!(
            released,
            vec![
                ActiveNote::new(0, 60, 100),
                ActiveNote::new(0, 67, 70),
                ActiveNote::new(1, 62, 90),
            ]
        );
        assert!(notes.is_empty());
        assert!(notes.release_all().is_empty());
    }

    #[test]
    fn test_percussion_not_tracked() {
        let mut notes = ActiveNotes::new();
        assert!(notes.is_percussion(9));
        assert!(notes.is_percussion(15));
        assert!(!notes.is_percussion(8));

        assert!(notes.note_on(9, 36, 120).is_none());
        assert!(notes.note_on(9, 36, 120).is_none());
        assert!(notes.is_empty());
    }

    #[test]
    fn test_percussion_can_be_disabled() {
        let mut notes = ActiveNotes::with_percussion_from(16);
        assert!(!notes.is_percussion(9));
        notes.note_on(9, 36, 120);
        assert!(notes.contains(9, 36));
    }

    #[test]
    fn test_note_off_bytes_keep_velocity() {
        let note = ActiveNote::new(3, 60, 77);
        assert_eq!(note.note_off(), [0x83, 60, 77]);
    }
}
