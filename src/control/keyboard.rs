// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keyboard shortcut handling.
//!
//! Provides configurable keyboard bindings for the transport and playback
//! actions. Defaults cover both the Ctrl+letter hotkeys and the console
//! navigation keys.

use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, bail, Result};
use crossterm::event::{KeyCode, KeyModifiers};

use super::ControlAction;

/// A keyboard shortcut definition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    /// Key code
    pub code: KeyCode,
    /// Required modifiers
    pub modifiers: KeyModifiers,
}

impl Shortcut {
    /// Create a new shortcut
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Create a shortcut with no modifiers
    pub fn key(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Create a shortcut with Ctrl modifier
    pub fn ctrl(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::CONTROL)
    }

    /// Check if this shortcut matches a key event
    pub fn matches(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        self.code == code && self.modifiers == modifiers
    }
}

/// A keyboard binding (shortcut to action)
#[derive(Debug, Clone)]
pub struct KeyBinding {
    /// The shortcut
    pub shortcut: Shortcut,
    /// The action to perform
    pub action: ControlAction,
    /// Description for help display
    pub description: String,
    /// Category for grouping in help
    pub category: String,
}

impl KeyBinding {
    /// Create a new key binding
    pub fn new(
        shortcut: Shortcut,
        action: ControlAction,
        description: impl Into<String>,
    ) -> Self {
        Self {
            shortcut,
            action,
            description: description.into(),
            category: "General".to_string(),
        }
    }

    /// Set the category
    pub fn category(mut self, cat: impl Into<String>) -> Self {
        self.category = cat.into();
        self
    }
}

/// Keyboard controller with configurable bindings
pub struct KeyboardController {
    bindings: HashMap<Shortcut, KeyBinding>,
}

impl KeyboardController {
    /// Create an empty keyboard controller
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Create a keyboard controller with default bindings
    pub fn with_defaults() -> Self {
        let mut controller = Self::new();
        controller.add_default_bindings();
        controller
    }

    fn add_default_bindings(&mut self) {
        let hotkeys = [
            ('p', ControlAction::PauseResume, "Pause/Resume", "Transport"),
            ('f', ControlAction::FastForward, "Fast Forward", "Transport"),
            ('r', ControlAction::Rewind, "Rewind", "Transport"),
            ('e', ControlAction::EndSong, "End Song", "Transport"),
            ('i', ControlAction::IncreaseSpeed, "Increase Speed", "Playback"),
            ('d', ControlAction::DecreaseSpeed, "Decrease Speed", "Playback"),
            ('l', ControlAction::ToggleLegitMode, "Toggle Legit Mode", "Playback"),
            ('s', ControlAction::DisableSustain, "Disable Sustain", "Playback"),
        ];
        for (c, action, description, category) in hotkeys {
            self.add(
                KeyBinding::new(Shortcut::ctrl(KeyCode::Char(c)), action, description)
                    .category(category),
            );
        }

        // Console navigation keys
        self.add(KeyBinding::new(
            Shortcut::key(KeyCode::PageUp),
            ControlAction::PauseResume,
            "Pause/Resume",
        ).category("Transport"));

        self.add(KeyBinding::new(
            Shortcut::key(KeyCode::End),
            ControlAction::FastForward,
            "Fast Forward",
        ).category("Transport"));

        self.add(KeyBinding::new(
            Shortcut::key(KeyCode::Home),
            ControlAction::Rewind,
            "Rewind",
        ).category("Transport"));

        self.add(KeyBinding::new(
            Shortcut::key(KeyCode::Esc),
            ControlAction::EndSong,
            "Return to Menu",
        ).category("Transport"));

        self.add(KeyBinding::new(
            Shortcut::ctrl(KeyCode::Char('c')),
            ControlAction::Quit,
            "Quit",
        ).category("Player"));
    }

    /// Add a key binding
    pub fn add(&mut self, binding: KeyBinding) {
        self.bindings.insert(binding.shortcut.clone(), binding);
    }

    /// Remove a key binding
    pub fn remove(&mut self, shortcut: &Shortcut) -> Option<KeyBinding> {
        self.bindings.remove(shortcut)
    }

    /// Bind keys from config overrides (`"ctrl+p" -> "pause_resume"`)
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, String>) -> Result<()> {
        for (key, name) in overrides {
            let shortcut = parse_shortcut(key)?;
            let action = ControlAction::from_name(name)
                .ok_or_else(|| anyhow!("Unknown action '{}' for key '{}'", name, key))?;
            let description = format!("{} (custom)", action.name());
            self.add(KeyBinding::new(shortcut, action, description).category("Custom"));
        }
        Ok(())
    }

    /// Get action for a key event
    pub fn get_action(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<&ControlAction> {
        let shortcut = Shortcut::new(code, modifiers);
        self.bindings.get(&shortcut).map(|b| &b.action)
    }

    /// Process a key event and return the action
    pub fn process_key(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<ControlAction> {
        // Terminals report Ctrl+Shift+letter as an uppercase char
        if let KeyCode::Char(c) = code {
            if modifiers.contains(KeyModifiers::CONTROL) {
                let mut plain = modifiers;
                plain.remove(KeyModifiers::SHIFT);
                return self
                    .get_action(KeyCode::Char(c.to_ascii_lowercase()), plain)
                    .cloned();
            }
        }
        self.get_action(code, modifiers).cloned()
    }

    /// Get all bindings for help display
    pub fn bindings(&self) -> impl Iterator<Item = &KeyBinding> {
        self.bindings.values()
    }

    /// Get bindings grouped by category
    pub fn bindings_by_category(&self) -> BTreeMap<String, Vec<&KeyBinding>> {
        let mut grouped: BTreeMap<String, Vec<&KeyBinding>> = BTreeMap::new();

        for binding in self.bindings.values() {
            grouped
                .entry(binding.category.clone())
                .or_default()
                .push(binding);
        }
        for bindings in grouped.values_mut() {
            bindings.sort_by_key(|b| format_shortcut(&b.shortcut));
        }

        grouped
    }

    /// One line per binding, grouped by category
    pub fn help_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (category, bindings) in self.bindings_by_category() {
            lines.push(format!("{}:", category));
            for binding in bindings {
                lines.push(format!(
                    "  {:<12} {}",
                    format_shortcut(&binding.shortcut),
                    binding.description
                ));
            }
        }
        lines
    }

    /// Get binding for a shortcut
    pub fn get_binding(&self, shortcut: &Shortcut) -> Option<&KeyBinding> {
        self.bindings.get(shortcut)
    }
}

impl Default for KeyboardController {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Parse a key spec such as `ctrl+p`, `pageup` or `space`
pub fn parse_shortcut(spec: &str) -> Result<Shortcut> {
    let mut modifiers = KeyModifiers::NONE;
    let mut code = None;

    for part in spec.split('+').map(str::trim) {
        let lower = part.to_ascii_lowercase();
        match lower.as_str() {
            "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
            "alt" => modifiers |= KeyModifiers::ALT,
            "shift" => modifiers |= KeyModifiers::SHIFT,
            key => {
                if code.is_some() {
                    bail!("More than one key in '{}'", spec);
                }
                code = Some(parse_key(key).ok_or_else(|| anyhow!("Unknown key '{}' in '{}'", part, spec))?);
            }
        }
    }

    let code = code.ok_or_else(|| anyhow!("No key in '{}'", spec))?;
    Ok(Shortcut::new(code, modifiers))
}

fn parse_key(key: &str) -> Option<KeyCode> {
    let code = match key {
        "space" => KeyCode::Char(' '),
        "esc" | "escape" => KeyCode::Esc,
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdn" => KeyCode::PageDown,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        _ => {
            if let Some(n) = key.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                return (1..=12).contains(&n).then_some(KeyCode::F(n));
            }
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None,
            }
        }
    };
    Some(code)
}

/// Format a shortcut for display
pub fn format_shortcut(shortcut: &Shortcut) -> String {
    let mut parts = Vec::new();

    if shortcut.modifiers.contains(KeyModifiers::CONTROL) {
        parts.push("Ctrl");
    }
    if shortcut.modifiers.contains(KeyModifiers::ALT) {
        parts.push("Alt");
    }
    if shortcut.modifiers.contains(KeyModifiers::SHIFT) {
        parts.push("Shift");
    }

    let key = match shortcut.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_uppercase().to_string(),
        KeyCode::F(n) => format!("F{}", n),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        _ => "?".to_string(),
    };

    parts.push(&key);
    parts.join("+")
}
