//! Input state tracking for the demo applications
//!
//! Windows messages arrive through winit and are forwarded to the
//! `Application` input seams. This module keeps the button/key state and
//! turns cursor movement into per-button drag deltas.

use std::collections::HashSet;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Cursor movement since the previous move event, tagged with the held buttons
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseDrag {
    pub dx: f32,
    pub dy: f32,
    pub left: bool,
    pub right: bool,
}

impl MouseDrag {
    /// True if any button was held while moving
    pub fn is_dragging(&self) -> bool {
        self.left || self.right
    }
}

/// InputSystem keeps keyboard and mouse state between events
#[derive(Debug, Default)]
pub struct InputSystem {
    pressed_keys: HashSet<KeyCode>,
    mouse_buttons: HashSet<MouseButton>,
    last_mouse_pos: Option<(f64, f64)>,
}

impl InputSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a button press at the given cursor position
    pub fn on_mouse_down(&mut self, button: MouseButton, position: (f64, f64)) {
        self.mouse_buttons.insert(button);
        self.last_mouse_pos = Some(position);
    }

    /// Record a button release
    pub fn on_mouse_up(&mut self, button: MouseButton, position: (f64, f64)) {
        self.mouse_buttons.remove(&button);
        self.last_mouse_pos = Some(position);
    }

    /// Process a cursor move and return the delta since the last known position
    pub fn on_mouse_move(&mut self, position: (f64, f64)) -> MouseDrag {
        let drag = match self.last_mouse_pos {
            Some(last) => MouseDrag {
                dx: (position.0 - last.0) as f32,
                dy: (position.1 - last.1) as f32,
                left: self.mouse_buttons.contains(&MouseButton::Left),
                right: self.mouse_buttons.contains(&MouseButton::Right),
            },
            // First movement only establishes the reference point
            None => MouseDrag::default(),
        };
        self.last_mouse_pos = Some(position);
        drag
    }

    /// Returns true when the key transitions from released to pressed
    pub fn on_key_down(&mut self, key: KeyCode) -> bool {
        self.pressed_keys.insert(key)
    }

    pub fn on_key_up(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn cursor_position(&self) -> Option<(f64, f64)> {
        self.last_mouse_pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_move_has_no_delta() {
        let mut input = InputSystem::new();
        let drag = input.on_mouse_move((10.0, 10.0));
        assert_eq!(drag, MouseDrag::default());
        assert_eq!(input.cursor_position(), Some((10.0, 10.0)));
    }

    #[test]
    fn test_drag_reports_held_buttons() {
        let mut input = InputSystem::new();
        input.on_mouse_down(MouseButton::Left, (100.0, 100.0));
        let drag = input.on_mouse_move((110.0, 95.0));
        assert!(drag.left);
        assert!(!drag.right);
        assert_eq!(drag.dx, 10.0);
        assert_eq!(drag.dy, -5.0);

        input.on_mouse_up(MouseButton::Left, (110.0, 95.0));
        let drag = input.on_mouse_move((120.0, 95.0));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_key_repeat_is_not_a_new_press() {
        let mut input = InputSystem::new();
        assert!(input.on_key_down(KeyCode::F2));
        assert!(!input.on_key_down(KeyCode::F2));
        input.on_key_up(KeyCode::F2);
        assert!(!input.is_key_down(KeyCode::F2));
        assert!(input.on_key_down(KeyCode::F2));
    }
}
