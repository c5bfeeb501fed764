// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Interactive console for a playing song.
//!
//! Puts the terminal in raw mode, maps key presses to actions and keeps a
//! one-line status display current until the song ends.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, Event, KeyEventKind},
    queue,
    style::Print,
    terminal::{self, disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use tracing::warn;

use super::{ControlAction, Flow, KeyboardController};
use crate::sequencer::{PlaybackStatus, Player};

/// Restores cooked mode when dropped
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Keyboard-driven front end for one song at a time
pub struct Console {
    keyboard: KeyboardController,
    /// Status refresh and key poll interval
    refresh: Duration,
}

impl Console {
    pub fn new(keyboard: KeyboardController) -> Self {
        Self {
            keyboard,
            refresh: Duration::from_millis(100),
        }
    }

    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh.max(Duration::from_millis(10));
        self
    }

    pub fn keyboard(&self) -> &KeyboardController {
        &self.keyboard
    }

    /// Drive the player's current session until it ends or the user quits
    pub fn run(&self, player: &mut Player) -> Result<Flow> {
        let mut stdout = io::stdout();
        for line in self.keyboard.help_lines() {
            writeln!(stdout, "{}", line)?;
        }

        let _raw = RawMode::enable()?;
        let flow = self.poll_loop(player, &mut stdout);
        // Leave the last status line intact
        write!(stdout, "\r\n")?;
        stdout.flush()?;
        flow
    }

    fn poll_loop(&self, player: &mut Player, out: &mut impl Write) -> Result<Flow> {
        loop {
            if event::poll(self.refresh)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        if let Some(action) = self.keyboard.process_key(key.code, key.modifiers) {
                            if self.handle(&action, player)? == Flow::Quit {
                                return Ok(Flow::Quit);
                            }
                        }
                    }
                }
            }

            let Some(session) = player.session() else {
                return Ok(Flow::Continue);
            };
            let width = terminal::size().map(|(w, _)| w as usize).unwrap_or(80);
            draw_status(out, &status_line(&session.status(), width))?;
            if session.is_finished() {
                return Ok(Flow::Continue);
            }
        }
    }

    fn handle(&self, action: &ControlAction, player: &mut Player) -> Result<Flow> {
        match action.apply(player) {
            Ok(flow) => Ok(flow),
            // A bad file should not take the console down with it
            Err(e) => {
                warn!(action = action.name(), error = %e, "control action failed");
                Ok(Flow::Continue)
            }
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(KeyboardController::with_defaults())
    }
}

fn draw_status(out: &mut impl Write, line: &str) -> io::Result<()> {
    queue!(
        out,
        cursor::MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(line)
    )?;
    out.flush()
}

/// Status text cut to fit a terminal line
pub fn status_line(status: &PlaybackStatus, width: usize) -> String {
    let line = status.to_string();
    let width = width.saturating_sub(1).max(1);
    if line.chars().count() <= width {
        line
    } else {
        line.chars().take(width).collect()
    }
}
