// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timeline events.

use crate::midi::messages;

/// Payload of a single event, as read from a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Note on (velocity > 0)
    NoteOn { channel: u8, key: u8, velocity: u8 },
    /// Note off, including note-on with velocity 0
    NoteOff { channel: u8, key: u8, velocity: u8 },
    /// Control change
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Set tempo meta event, microseconds per quarter note
    Tempo(u32),
    /// Other meta events the player displays or uses for structure
    Meta(MetaEvent),
    /// Anything the scheduler does not dispatch (program change, sysex, ...)
    Other,
}

/// Meta events that carry display information or track structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaEvent {
    /// Key signature: sharps (negative for flats), minor flag
    KeySignature { sharps: i8, minor: bool },
    /// Time signature: numerator, denominator as a power of two
    TimeSignature { numerator: u8, denominator_pow: u8 },
    /// Lyric text
    Lyric(String),
    /// Required final event of every track
    EndOfTrack,
    /// Unused meta event
    Other,
}

impl EventKind {
    /// Note on event; velocity 0 is normalised to a note off
    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        if velocity == 0 {
            EventKind::NoteOff {
                channel,
                key,
                velocity: 0,
            }
        } else {
            EventKind::NoteOn {
                channel,
                key,
                velocity,
            }
        }
    }

    pub fn note_off(channel: u8, key: u8) -> Self {
        EventKind::NoteOff {
            channel,
            key,
            velocity: 0,
        }
    }

    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        EventKind::ControlChange {
            channel,
            controller,
            value,
        }
    }

    pub fn sustain(channel: u8, value: u8) -> Self {
        Self::control_change(channel, messages::SUSTAIN_PEDAL, value)
    }

    pub fn end_of_track() -> Self {
        EventKind::Meta(MetaEvent::EndOfTrack)
    }

    /// MIDI channel for channel voice events
    pub fn channel(&self) -> Option<u8> {
        match self {
            EventKind::NoteOn { channel, .. }
            | EventKind::NoteOff { channel, .. }
            | EventKind::ControlChange { channel, .. } => Some(*channel),
            _ => None,
        }
    }

    pub fn is_end_of_track(&self) -> bool {
        matches!(self, EventKind::Meta(MetaEvent::EndOfTrack))
    }

    /// Convert channel voice events to MIDI bytes
    pub fn to_midi_bytes(&self) -> Option<[u8; 3]> {
        match *self {
            EventKind::NoteOn {
                channel,
                key,
                velocity,
            } => Some(messages::note_on(channel, key, velocity)),
            EventKind::NoteOff {
                channel,
                key,
                velocity,
            } => Some(messages::note_off(channel, key, velocity)),
            EventKind::ControlChange {
                channel,
                controller,
                value,
            } => Some(messages::control_change(channel, controller, value)),
            _ => None,
        }
    }
}

/// An event placed on the timeline at an absolute tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Absolute tick from the start of the song
    pub tick: u64,
    /// Index of the source track
    pub track: usize,
    pub kind: EventKind,
}

/// Name of a key signature, e.g. "Bb Major"
pub fn key_signature_name(sharps: i8, minor: bool) -> String {
    let key = match sharps {
        0 => "C",
        1 => "G",
        2 => "D",
        3 => "A",
        4 => "E",
        5 => "B",
        6 => "F#",
        7 => "C#",
        -1 => "F",
        -2 => "Bb",
        -3 => "Eb",
        -4 => "Ab",
        -5 => "Db",
        -6 => "Gb",
        -7 => "Cb",
        _ => "Unknown",
    };
    let scale = if minor { "Minor" } else { "Major" };
    format!("{} {}", key, scale)
}

/// Time signature as text, e.g. "6/8"
pub fn time_signature_name(numerator: u8, denominator_pow: u8) -> String {
    let denominator = 1u32.checked_shl(denominator_pow as u32).unwrap_or(0);
    format!("{}/{}", numerator, denominator)
}
