// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Parsing of raw outgoing MIDI bytes.
//!
//! Sinks only see byte slices; this turns them back into something readable
//! for logging and for assertions on recorded output.

use std::fmt;

use super::messages;

/// Parsed channel voice message
#[derive(Debug, Clone, PartialEq)]
pub enum MidiMessage {
    /// Note On: channel (0-15), note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Polyphonic aftertouch: channel (0-15), note (0-127), pressure (0-127)
    PolyAftertouch { channel: u8, note: u8, pressure: u8 },
    /// Control Change: channel (0-15), controller (0-127), value (0-127)
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Program Change: channel (0-15), program (0-127)
    ProgramChange { channel: u8, program: u8 },
    /// Channel aftertouch: channel (0-15), pressure (0-127)
    ChannelAftertouch { channel: u8, pressure: u8 },
    /// Pitch Bend: channel (0-15), value (-8192 to 8191)
    PitchBend { channel: u8, value: i16 },
    /// Unknown/unparsed message
    Unknown(Vec<u8>),
}

impl MidiMessage {
    /// Parse raw MIDI bytes into a MidiMessage
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }

        let status = data[0];
        let msg_type = status & 0xF0;
        let channel = status & 0x0F;

        match msg_type {
            messages::NOTE_OFF if data.len() >= 3 => Some(MidiMessage::NoteOff {
                channel,
                note: data[1] & 0x7F,
                velocity: data[2] & 0x7F,
            }),
            messages::NOTE_ON if data.len() >= 3 => {
                let velocity = data[2] & 0x7F;
                // Note On with velocity 0 is equivalent to Note Off
                if velocity == 0 {
                    Some(MidiMessage::NoteOff {
                        channel,
                        note: data[1] & 0x7F,
                        velocity: 0,
                    })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note: data[1] & 0x7F,
                        velocity,
                    })
                }
            }
            messages::POLY_AFTERTOUCH if data.len() >= 3 => Some(MidiMessage::PolyAftertouch {
                channel,
                note: data[1] & 0x7F,
                pressure: data[2] & 0x7F,
            }),
            messages::CONTROL_CHANGE if data.len() >= 3 => Some(MidiMessage::ControlChange {
                channel,
                controller: data[1] & 0x7F,
                value: data[2] & 0x7F,
            }),
            messages::PROGRAM_CHANGE if data.len() >= 2 => Some(MidiMessage::ProgramChange {
                channel,
                program: data[1] & 0x7F,
            }),
            messages::CHANNEL_AFTERTOUCH if data.len() >= 2 => {
                Some(MidiMessage::ChannelAftertouch {
                    channel,
                    pressure: data[1] & 0x7F,
                })
            }
            messages::PITCH_BEND if data.len() >= 3 => {
                let lsb = data[1] as i16;
                let msb = data[2] as i16;
                let value = ((msb << 7) | lsb) - 8192;
                Some(MidiMessage::PitchBend { channel, value })
            }
            _ => Some(MidiMessage::Unknown(data.to_vec())),
        }
    }

    /// Check if this message ends a note
    pub fn is_note_off(&self) -> bool {
        matches!(self, MidiMessage::NoteOff { .. })
    }

    /// Check if this message starts a note
    pub fn is_note_on(&self) -> bool {
        matches!(self, MidiMessage::NoteOn { .. })
    }

    /// Check if this is a sustain pedal message
    pub fn is_sustain(&self) -> bool {
        matches!(
            self,
            MidiMessage::ControlChange {
                controller: messages::SUSTAIN_PEDAL,
                ..
            }
        )
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch={} note={} vel={}", channel, note, velocity)
            }
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch={} note={} vel={}", channel, note, velocity)
            }
            MidiMessage::PolyAftertouch { channel, note, pressure } => {
                write!(f, "PolyAftertouch ch={} note={} pressure={}", channel, note, pressure)
            }
            MidiMessage::ControlChange { channel, controller, value } => {
                write!(f, "CC ch={} cc={} value={}", channel, controller, value)
            }
            MidiMessage::ProgramChange { channel, program } => {
                write!(f, "Program ch={} program={}", channel, program)
            }
            MidiMessage::ChannelAftertouch { channel, pressure } => {
                write!(f, "Aftertouch ch={} pressure={}", channel, pressure)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch={} value={}", channel, value)
            }
            MidiMessage::Unknown(bytes) => write!(f, "Raw {:02X?}", bytes),
        }
    }
}
