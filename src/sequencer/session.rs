// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback session: the playback thread plus its transport controls.
//!
//! The engine sits behind one mutex. The playback thread holds it while it
//! dispatches a tick and releases it while it waits on the condition
//! variable, so transport operations run on the caller's thread and then
//! wake the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::engine::{PlaybackEngine, PlaybackOptions, SeekDirection, Step};
use super::status::{PlaybackReport, PlaybackStatus};
use super::timeline::Timeline;
use crate::error::{PlaybackError, Result};
use crate::midi::MidiOutput;

struct Shared {
    engine: Mutex<PlaybackEngine>,
    wake: Condvar,
    speed: Mutex<f64>,
    legit: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn engine(&self) -> MutexGuard<'_, PlaybackEngine> {
        lock(&self.engine)
    }

    fn speed(&self) -> f64 {
        *lock(&self.speed)
    }

    /// Run a transport operation and wake the loop
    fn transport<R>(&self, op: impl FnOnce(&mut PlaybackEngine) -> R) -> R {
        let result = {
            let mut engine = self.engine();
            op(&mut *engine)
        };
        self.wake.notify_all();
        result
    }
}

/// A song playing on its own thread
pub struct PlaybackSession {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<PlaybackReport>>,
    seek_step_ms: u64,
    speed_step: f64,
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("seek_step_ms", &self.seek_step_ms)
            .field("speed_step", &self.speed_step)
            .finish_non_exhaustive()
    }
}

impl PlaybackSession {
    /// Start playing `timeline` on `output`.
    ///
    /// # Errors
    /// `Io` if the playback thread cannot be spawned.
    pub fn start(
        timeline: Arc<Timeline>,
        output: Box<dyn MidiOutput>,
        options: PlaybackOptions,
    ) -> Result<Self> {
        let speed = if is_valid_speed(options.initial_speed) {
            options.initial_speed
        } else {
            warn!(speed = options.initial_speed, "invalid initial speed, using 1.0");
            1.0
        };
        let seek_step_ms = options.seek_step_ms;
        let speed_step = if is_valid_speed(options.speed_step) {
            options.speed_step
        } else {
            1.1
        };
        let legit = options.legit_mode;

        info!(
            events = timeline.len(),
            tracks = timeline.track_count(),
            last_tick = timeline.last_tick(),
            "starting playback"
        );

        let shared = Arc::new(Shared {
            engine: Mutex::new(PlaybackEngine::new(timeline, output, options)),
            wake: Condvar::new(),
            speed: Mutex::new(speed),
            legit: AtomicBool::new(legit),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || run(&thread_shared))?;

        Ok(Self {
            shared,
            handle: Some(handle),
            seek_step_ms,
            speed_step,
        })
    }

    /// Pause or resume. Returns true if now paused.
    pub fn pause_resume(&self) -> bool {
        self.shared.transport(PlaybackEngine::toggle_pause)
    }

    pub fn fast_forward(&self) -> u64 {
        self.seek(self.seek_step_ms, SeekDirection::Forward)
    }

    pub fn rewind(&self) -> u64 {
        self.seek(self.seek_step_ms, SeekDirection::Backward)
    }

    /// Jump `millis` in `direction`. Returns the new tick.
    pub fn seek(&self, millis: u64, direction: SeekDirection) -> u64 {
        self.shared.transport(|engine| engine.seek(millis, direction))
    }

    /// Multiply the playback speed by `factor`.
    ///
    /// # Errors
    /// `InvalidSpeed` if `factor` is not a finite positive number, or if the
    /// product would overflow or underflow. The speed is left unchanged.
    pub fn set_speed(&self, factor: f64) -> Result<f64> {
        if !is_valid_speed(factor) {
            return Err(PlaybackError::InvalidSpeed(factor));
        }

        let speed = {
            let mut speed = lock(&self.shared.speed);
            let next = *speed * factor;
            if !is_valid_speed(next) {
                return Err(PlaybackError::InvalidSpeed(factor));
            }
            *speed = next;
            next
        };

        self.shared.engine().set_message(format!("Speed {:.2}x", speed));
        info!(speed, "playback speed changed");
        Ok(speed)
    }

    pub fn increase_speed(&self) -> f64 {
        self.set_speed(self.speed_step).unwrap_or_else(|_| self.speed())
    }

    pub fn decrease_speed(&self) -> f64 {
        self.set_speed(1.0 / self.speed_step)
            .unwrap_or_else(|_| self.speed())
    }

    pub fn speed(&self) -> f64 {
        self.shared.speed()
    }

    /// Flip humanized Note On timing. Returns the new flag.
    pub fn toggle_legit_mode(&self) -> bool {
        let enabled = !self.shared.legit.fetch_xor(true, Ordering::SeqCst);
        let message = if enabled {
            "Legit mode on"
        } else {
            "Legit mode off"
        };
        self.shared.engine().set_message(message);
        info!(enabled, "legit mode toggled");
        enabled
    }

    pub fn is_legit_mode(&self) -> bool {
        self.shared.legit.load(Ordering::SeqCst)
    }

    /// End the song. Callable while paused.
    pub fn stop(&self) {
        self.shared.transport(PlaybackEngine::stop);
    }

    pub fn disable_sustain(&self) {
        self.shared.transport(PlaybackEngine::disable_sustain);
    }

    pub fn status(&self) -> PlaybackStatus {
        let speed = self.speed();
        let legit = self.is_legit_mode();
        self.shared.engine().status(speed, legit)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.engine().is_paused()
    }

    /// True once the playback thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Block until the song ends and return its report
    pub fn wait(mut self) -> PlaybackReport {
        self.join()
    }

    fn join(&mut self) -> PlaybackReport {
        let Some(handle) = self.handle.take() else {
            return PlaybackReport::default();
        };
        match handle.join() {
            Ok(report) => report,
            Err(_) => {
                warn!("playback thread panicked, releasing notes");
                self.shared.engine().finish()
            }
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
            self.join();
        }
    }
}

/// Finite, positive and not subnormal
fn is_valid_speed(speed: f64) -> bool {
    speed.is_normal() && speed > 0.0
}

fn run(shared: &Shared) -> PlaybackReport {
    let mut engine = shared.engine();

    loop {
        engine = shared
            .wake
            .wait_while(engine, |e| e.is_paused() && !e.is_ended())
            .unwrap_or_else(PoisonError::into_inner);

        let legit = shared.legit.load(Ordering::SeqCst);
        let mut remaining = match engine.step(legit) {
            Step::Wait(ticks) => engine.wait_for(ticks, shared.speed()),
            Step::Delay(delay) => delay,
            Step::Finished => break,
        };
        let epoch = engine.epoch();

        loop {
            let started = Instant::now();
            let (guard, _) = shared
                .wake
                .wait_timeout_while(engine, remaining, |e| {
                    !e.is_paused() && !e.is_ended() && e.epoch() == epoch
                })
                .unwrap_or_else(PoisonError::into_inner);
            engine = guard;

            if engine.is_ended() || engine.epoch() != epoch || !engine.is_paused() {
                break;
            }

            // Paused mid-wait: park, then finish the rest of the wait
            remaining = remaining.saturating_sub(started.elapsed());
            debug!(remaining_ms = remaining.as_millis() as u64, "wait suspended");
            engine = shared
                .wake
                .wait_while(engine, |e| {
                    e.is_paused() && !e.is_ended() && e.epoch() == epoch
                })
                .unwrap_or_else(PoisonError::into_inner);
            if remaining == Duration::ZERO {
                break;
            }
        }
    }

    engine.finish()
}
