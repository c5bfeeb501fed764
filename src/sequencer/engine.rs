// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback engine.
//!
//! The engine owns everything one session mutates: the cursor into the
//! timeline, the running tempo, the active-note registry, the sustain pedal
//! and the output. It is purely synchronous; [`PlaybackSession`] wraps it in
//! a mutex and drives it from the playback thread.
//!
//! Every transport transition (pause, seek, stop, end of song) goes through
//! [`PlaybackEngine::release_all`], so no note survives it.
//!
//! [`PlaybackSession`]: super::session::PlaybackSession

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use super::active_notes::{ActiveNote, ActiveNotes, DEFAULT_PERCUSSION_FROM};
use super::event::{key_signature_name, time_signature_name, EventKind, MetaEvent};
use super::status::{PlaybackReport, PlaybackState, PlaybackStatus};
use super::sustain::{PedalChange, SustainMode, SustainPedal};
use super::timeline::Timeline;
use crate::error::PlaybackError;
use crate::midi::{messages, MidiOutput};
use crate::timing::TempoMap;

/// Runtime settings for a playback session
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOptions {
    /// Distance of one fast-forward/rewind step
    pub seek_step_ms: u64,
    /// Factor applied by increase/decrease speed
    pub speed_step: f64,
    /// Starting playback speed
    pub initial_speed: f64,
    pub sustain_mode: SustainMode,
    /// Humanize Note On timing from the start
    pub legit_mode: bool,
    /// Inclusive range of legit-mode delays
    pub legit_delay_ms: (u64, u64),
    /// First percussion channel (0-based), 16 disables percussion handling
    pub percussion_from: u8,
    /// Fixed RNG seed for reproducible legit-mode delays
    pub seed: Option<u64>,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            seek_step_ms: 5000,
            speed_step: 1.1,
            initial_speed: 1.0,
            sustain_mode: SustainMode::Emulated,
            legit_mode: false,
            legit_delay_ms: (5, 50),
            percussion_from: DEFAULT_PERCUSSION_FROM,
            seed: None,
        }
    }
}

/// Direction of a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Backward,
}

/// Outcome of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Wait this many ticks before the next iteration
    Wait(u64),
    /// Legit-mode pause before the next Note On at the same tick
    Delay(Duration),
    /// The song is over
    Finished,
}

/// Session state driven by the playback loop
pub struct PlaybackEngine {
    timeline: Arc<Timeline>,
    tempo: TempoMap,
    notes: ActiveNotes,
    sustain: SustainPedal,
    output: Box<dyn MidiOutput>,
    options: PlaybackOptions,
    current_tick: u64,
    /// Next event to dispatch within the current tick
    event_index: usize,
    /// The event at `event_index` has already had its legit-mode delay
    humanized: bool,
    paused: bool,
    seeking: bool,
    ended: bool,
    completed: bool,
    disposed: bool,
    /// Bumped by seek and stop so a sleeping loop knows its wait is stale
    epoch: u64,
    key_signature: Option<String>,
    time_signature: Option<String>,
    lyrics: Option<String>,
    message: Option<String>,
    rng: StdRng,
    stats: PlaybackReport,
    started: Instant,
}

impl PlaybackEngine {
    pub fn new(timeline: Arc<Timeline>, output: Box<dyn MidiOutput>, options: PlaybackOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            tempo: TempoMap::new(timeline.division()),
            notes: ActiveNotes::with_percussion_from(options.percussion_from),
            sustain: SustainPedal::new(options.sustain_mode),
            timeline,
            output,
            options,
            current_tick: 0,
            event_index: 0,
            humanized: false,
            paused: false,
            seeking: false,
            ended: false,
            completed: false,
            disposed: false,
            epoch: 0,
            key_signature: None,
            time_signature: None,
            lyrics: None,
            message: None,
            rng,
            stats: PlaybackReport::default(),
            started: Instant::now(),
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn tempo(&self) -> &TempoMap {
        &self.tempo
    }

    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    pub fn active_notes(&self) -> &ActiveNotes {
        &self.notes
    }

    pub fn sustain(&self) -> &SustainPedal {
        &self.sustain
    }

    /// Tick of the next events to dispatch.
    ///
    /// While the loop waits out a rest this is already the tick it is waiting
    /// for, not the elapsed position.
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> PlaybackState {
        if self.ended {
            PlaybackState::Ended
        } else if self.seeking {
            PlaybackState::Seeking
        } else if self.paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Running
        }
    }

    /// Dispatch the events at the current tick and advance the cursor.
    ///
    /// In legit mode this stops before each Note On and returns
    /// [`Step::Delay`]; the next call picks up at that Note On. The caller does
    /// the waiting so the engine is never held across a delay.
    pub fn step(&mut self, legit: bool) -> Step {
        if self.ended {
            return Step::Finished;
        }

        let timeline = Arc::clone(&self.timeline);
        let events = timeline.events_at(self.current_tick);
        while let Some(event) = events.get(self.event_index) {
            if legit && !self.humanized {
                if let Some(delay) = self.prepare_note_on(&event.kind) {
                    self.humanized = true;
                    return Step::Delay(delay);
                }
            }
            self.humanized = false;
            self.event_index += 1;
            self.dispatch(&event.kind);
        }
        self.event_index = 0;

        match timeline.next_tick_after(self.current_tick) {
            Some(next) => {
                let delta = next - self.current_tick;
                self.current_tick = next;
                Step::Wait(delta)
            }
            None => {
                self.completed = true;
                self.ended = true;
                Step::Finished
            }
        }
    }

    /// Wall-clock wait for a tick distance at the current tempo
    pub fn wait_for(&self, ticks: u64, speed: f64) -> Duration {
        self.tempo.ticks_to_duration(ticks, speed)
    }

    /// Dispatch a single event through the registry and sustain pedal
    pub fn dispatch(&mut self, kind: &EventKind) {
        match *kind {
            EventKind::NoteOn {
                channel,
                key,
                velocity: 0,
            } => self.note_off(channel, key, 0),
            EventKind::NoteOn {
                channel,
                key,
                velocity,
            } => self.note_on(channel, key, velocity),
            EventKind::NoteOff {
                channel,
                key,
                velocity,
            } => self.note_off(channel, key, velocity),
            EventKind::ControlChange {
                channel,
                controller,
                value,
            } => {
                if let Err(e) = self.control_change(channel, controller, value) {
                    self.stats.invalid_controls += 1;
                    warn!(tick = self.current_tick, "{}; message skipped", e);
                }
            }
            EventKind::Tempo(micros) => {
                if let Err(e) = self.tempo.set_tempo(micros) {
                    warn!(tick = self.current_tick, "{}", e);
                }
                debug!(tick = self.current_tick, bpm = self.tempo.bpm(), "tempo change");
            }
            EventKind::Meta(ref meta) => self.meta(meta),
            EventKind::Other => {}
        }
    }

    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
        if self.notes.is_percussion(channel) {
            self.send(&messages::note_on(channel, key, velocity));
            return;
        }

        self.sustain.cancel(channel, key);
        if let Some(previous) = self.notes.note_on(channel, key, velocity) {
            debug!(channel, key, "key struck while sounding, releasing it first");
            self.send(&previous.note_off());
        }
        self.send(&messages::note_on(channel, key, velocity));
    }

    /// Legit-mode delay owed before `kind`, if it is a tracked Note On.
    ///
    /// A key that is still sounding is released here so the delay falls
    /// between its Note Off and the re-strike.
    fn prepare_note_on(&mut self, kind: &EventKind) -> Option<Duration> {
        let EventKind::NoteOn { channel, key, velocity } = *kind else {
            return None;
        };
        if velocity == 0 || self.notes.is_percussion(channel) {
            return None;
        }

        self.sustain.cancel(channel, key);
        if let Some(previous) = self.notes.note_off(channel, key) {
            debug!(channel, key, "key struck while sounding, releasing it first");
            self.send(&previous.note_off());
        }
        Some(self.humanize_delay())
    }

    fn note_off(&mut self, channel: u8, key: u8, velocity: u8) {
        if self.notes.is_percussion(channel) {
            self.send(&messages::note_off(channel, key, velocity));
            return;
        }

        if !self.notes.contains(channel, key) {
            return;
        }

        if self.sustain.withhold(ActiveNote::new(channel, key, velocity)) {
            debug!(channel, key, "note off withheld by sustain pedal");
            return;
        }

        if self.notes.note_off(channel, key).is_some() {
            self.send(&messages::note_off(channel, key, velocity));
        }
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) -> Result<(), PlaybackError> {
        if channel >= messages::CHANNELS || controller > 127 || value > 127 {
            return Err(PlaybackError::InvalidControlValue {
                channel,
                controller,
                value,
            });
        }

        if controller != messages::SUSTAIN_PEDAL {
            self.send(&messages::control_change(channel, controller, value));
            return Ok(());
        }

        let change = self.sustain.controller(channel, value);
        match self.sustain.mode() {
            SustainMode::Device => {
                self.send(&messages::control_change(channel, controller, value));
            }
            SustainMode::Emulated => match change {
                PedalChange::Unchanged => {}
                PedalChange::Pressed => {
                    self.send(&messages::control_change(
                        channel,
                        messages::SUSTAIN_PEDAL,
                        messages::PEDAL_ON,
                    ));
                }
                PedalChange::Released(withheld) => {
                    self.send(&messages::control_change(
                        channel,
                        messages::SUSTAIN_PEDAL,
                        messages::PEDAL_OFF,
                    ));
                    for note in withheld {
                        if self.notes.note_off(note.channel, note.key).is_some() {
                            self.send(&note.note_off());
                        }
                    }
                }
            },
        }
        Ok(())
    }

    fn meta(&mut self, meta: &MetaEvent) {
        match meta {
            MetaEvent::KeySignature { sharps, minor } => {
                self.key_signature = Some(key_signature_name(*sharps, *minor));
            }
            MetaEvent::TimeSignature {
                numerator,
                denominator_pow,
            } => {
                self.time_signature = Some(time_signature_name(*numerator, *denominator_pow));
            }
            MetaEvent::Lyric(text) => {
                self.lyrics = Some(text.clone());
            }
            MetaEvent::EndOfTrack | MetaEvent::Other => {}
        }
    }

    fn humanize_delay(&mut self) -> Duration {
        let (a, b) = self.options.legit_delay_ms;
        Duration::from_millis(self.rng.gen_range(a.min(b)..=a.max(b)))
    }

    fn send(&mut self, message: &[u8]) {
        if self.disposed {
            return;
        }
        match self.output.send(message) {
            Ok(()) => self.stats.messages_sent += 1,
            Err(e) => {
                self.stats.send_errors += 1;
                error!(error = %e, "failed to send MIDI message");
            }
        }
    }

    /// Send Note Off for every sounding note and clear the registry.
    ///
    /// Withheld sustain Note Offs are dropped too since their notes are
    /// silenced here. Returns the number of notes released.
    pub fn release_all(&mut self) -> usize {
        let released = self.notes.release_all();
        for note in &released {
            self.send(&note.note_off());
        }
        self.sustain.clear_withheld();

        if !released.is_empty() {
            debug!(count = released.len(), "released active notes");
        }
        self.stats.notes_released += released.len() as u64;
        released.len()
    }

    /// Toggle pause. Pausing silences every sounding note.
    ///
    /// Returns the new paused flag.
    pub fn toggle_pause(&mut self) -> bool {
        if self.ended {
            return self.paused;
        }

        self.paused = !self.paused;
        if self.paused {
            self.release_all();
            self.message = Some("Paused".to_string());
            info!(tick = self.current_tick, "paused");
        } else {
            self.message = Some("Resumed".to_string());
            info!(tick = self.current_tick, "resumed");
        }
        self.paused
    }

    /// Move the cursor by `millis` at the current tempo.
    ///
    /// Forward seeks stop one tick short of the end so the loop still finishes
    /// normally. Events between the old and new position are not replayed.
    /// Returns the new tick.
    pub fn seek(&mut self, millis: u64, direction: SeekDirection) -> u64 {
        if self.ended {
            return self.current_tick;
        }

        self.seeking = true;
        self.release_all();

        let from = self.current_tick;
        let delta = self.tempo.millis_to_ticks(millis);
        let last = self.timeline.last_tick();
        let to = match direction {
            SeekDirection::Forward => from.saturating_add(delta).min(last.saturating_sub(1)),
            SeekDirection::Backward => from.saturating_sub(delta).min(last),
        };

        self.current_tick = to;
        self.event_index = 0;
        self.humanized = false;
        self.epoch += 1;
        self.seeking = false;

        let label = match direction {
            SeekDirection::Forward => "Fast forward",
            SeekDirection::Backward => "Rewind",
        };
        let message = format!(
            "{} from {:.3} seconds to {:.3} seconds",
            label,
            self.tempo.ticks_to_seconds(from),
            self.tempo.ticks_to_seconds(to)
        );
        info!(from, to, "{}", message);
        self.message = Some(message);
        to
    }

    /// End the session early. Terminal.
    pub fn stop(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.paused = false;
        self.epoch += 1;
        self.release_all();
        self.message = Some("Song ended".to_string());
        info!(tick = self.current_tick, "playback stopped");
    }

    /// Force the pedal up on every channel without flushing withheld notes
    pub fn disable_sustain(&mut self) {
        if self.disposed {
            return;
        }
        self.sustain.disable();
        for channel in 0..messages::CHANNELS {
            self.send(&messages::control_change(
                channel,
                messages::SUSTAIN_PEDAL,
                messages::PEDAL_OFF,
            ));
        }
        self.message = Some("Sustain pedal disabled".to_string());
        info!("sustain pedal disabled");
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Silence everything, release the output and summarise the session
    pub fn finish(&mut self) -> PlaybackReport {
        self.ended = true;
        self.paused = false;
        self.release_all();

        if !self.disposed {
            if let Err(e) = self.output.dispose() {
                error!(error = %e, "failed to release MIDI output");
            }
            self.disposed = true;
        }

        if self.completed {
            self.message = Some("Song ended".to_string());
        }

        let report = PlaybackReport {
            final_tick: self.current_tick,
            completed: self.completed,
            elapsed: self.started.elapsed(),
            ..self.stats.clone()
        };
        info!(
            final_tick = report.final_tick,
            completed = report.completed,
            messages = report.messages_sent,
            "playback finished"
        );
        report
    }

    /// Snapshot for display
    pub fn status(&self, speed: f64, legit_mode: bool) -> PlaybackStatus {
        let last_tick = self.timeline.last_tick();
        PlaybackStatus {
            state: self.state(),
            tick: self.current_tick,
            last_tick,
            position: self.tempo.format_position(self.current_tick),
            length: self.tempo.format_position(last_tick),
            tempo_bpm: self.tempo.bpm(),
            speed,
            legit_mode,
            key_signature: self.key_signature.clone(),
            time_signature: self.time_signature.clone(),
            lyrics: self.lyrics.clone(),
            active_notes: self.notes.len(),
            message: self.message.clone(),
        }
    }
}
