// src/ui/keybindings.rs
//! Keyboard input handling and key mappings.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Map digit/shifted-digit keys to section number (1..2).
pub fn map_key_to_digit(k: &KeyEvent) -> Option<usize> {
    match k.code {
        KeyCode::Char('1' | '!') => Some(1),
        KeyCode::Char('2' | '@') => Some(2),
        _ => None,
    }
}

/// Check if the key event is a shifted symbol (!, @).
fn is_shifted_symbol(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('!' | '@'))
}

/// Actions derived from key events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    TogglePause,
    Stop,
    /// Shift the test tone by this many semitones
    Transpose(i32),
    ToggleSection(usize),
    Quit,
    None,
}

/// Convert a key event to an action.
pub fn key_to_action(key: &KeyEvent) -> Action {
    if let Some(d) = map_key_to_digit(key) {
        if key.modifiers.contains(KeyModifiers::SHIFT) || is_shifted_symbol(key) {
            return Action::ToggleSection(d);
        }
    }

    match key.code {
        KeyCode::Char(' ') => Action::TogglePause,
        KeyCode::Char('s') => Action::Stop,
        KeyCode::Up => Action::Transpose(1),
        KeyCode::Down => Action::Transpose(-1),
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn maps_playback_keys() {
        assert_eq!(key_to_action(&key(KeyCode::Char(' '), KeyModifiers::NONE)), Action::TogglePause);
        assert_eq!(key_to_action(&key(KeyCode::Char('s'), KeyModifiers::NONE)), Action::Stop);
        assert_eq!(key_to_action(&key(KeyCode::Up, KeyModifiers::NONE)), Action::Transpose(1));
        assert_eq!(key_to_action(&key(KeyCode::Down, KeyModifiers::NONE)), Action::Transpose(-1));
        assert_eq!(key_to_action(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)), Action::Quit);
    }

    #[test]
    fn shifted_digits_toggle_sections() {
        assert_eq!(key_to_action(&key(KeyCode::Char('!'), KeyModifiers::NONE)), Action::ToggleSection(1));
        assert_eq!(key_to_action(&key(KeyCode::Char('2'), KeyModifiers::SHIFT)), Action::ToggleSection(2));
        assert_eq!(key_to_action(&key(KeyCode::Char('2'), KeyModifiers::NONE)), Action::None);
    }
}
