//! Keyboard edge detection for directional intent

use macroquad::prelude::KeyCode;
use shared::IntentState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Up,
    Down,
    Left,
    Right,
}

/// Maps a physical key to the axis it drives. Arrow keys and WASD share axes.
pub fn axis_for(key: KeyCode) -> Option<Axis> {
    match key {
        KeyCode::Up | KeyCode::W => Some(Axis::Up),
        KeyCode::Down | KeyCode::S => Some(Axis::Down),
        KeyCode::Left | KeyCode::A => Some(Axis::Left),
        KeyCode::Right | KeyCode::D => Some(Axis::Right),
        _ => None,
    }
}

/// Turns raw key-down/key-up signals into intent changes, one per real edge.
///
/// Key-repeat and already-released signals produce nothing; consumers rely on
/// this to send exactly one message per transition.
#[derive(Debug, Default)]
pub struct InputTracker {
    intent: IntentState,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the full intent snapshot if `key` raised its axis.
    pub fn on_key_down(&mut self, key: KeyCode) -> Option<IntentState> {
        self.set(key, true)
    }

    /// Returns the full intent snapshot if `key` released its axis.
    pub fn on_key_up(&mut self, key: KeyCode) -> Option<IntentState> {
        self.set(key, false)
    }

    pub fn intent(&self) -> IntentState {
        self.intent
    }

    fn set(&mut self, key: KeyCode, pressed: bool) -> Option<IntentState> {
        let flag = match axis_for(key)? {
            Axis::Up => &mut self.intent.up,
            Axis::Down => &mut self.intent.down,
            Axis::Left => &mut self.intent.left,
            Axis::Right => &mut self.intent.right,
        };

        if *flag == pressed {
            return None;
        }

        *flag = pressed;
        Some(self.intent)
    }
}
