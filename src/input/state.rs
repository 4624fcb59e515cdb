//! Input handling

use glam::Vec2;
use rustc_hash::FxHashSet;
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

/// Pixels of a high-resolution scroll that count as one wheel line
const PIXELS_PER_LINE: f32 = 40.0;

/// Input state manager
#[derive(Debug, Default)]
pub struct Input {
    /// Currently pressed keys
    pressed_keys: FxHashSet<KeyCode>,
    /// Keys that were just pressed this frame
    just_pressed_keys: FxHashSet<KeyCode>,
    /// Currently pressed mouse buttons
    pressed_mouse_buttons: FxHashSet<MouseButton>,
    /// Current mouse position
    mouse_position: Option<Vec2>,
    /// Movement accumulated while a button was held, this frame
    drag_delta: Vec2,
    /// Scroll wheel lines this frame, positive away from the user
    scroll_lines: f32,
}

impl Input {
    /// Create a new input manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the end of each frame to clear per-frame state
    pub fn update(&mut self) {
        self.just_pressed_keys.clear();
        self.drag_delta = Vec2::ZERO;
        self.scroll_lines = 0.0;
    }

    /// Process a keyboard event
    pub fn process_keyboard(&mut self, key_code: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.pressed_keys.insert(key_code) {
                    self.just_pressed_keys.insert(key_code);
                }
            }
            ElementState::Released => {
                self.pressed_keys.remove(&key_code);
            }
        }
    }

    /// Process a mouse button event
    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.pressed_mouse_buttons.insert(button);
            }
            ElementState::Released => {
                self.pressed_mouse_buttons.remove(&button);
            }
        }
    }

    /// Process cursor movement; only movement with a button held drags
    pub fn process_mouse_motion(&mut self, position: Vec2) {
        if let Some(previous) = self.mouse_position {
            if !self.pressed_mouse_buttons.is_empty() {
                self.drag_delta += position - previous;
            }
        }
        self.mouse_position = Some(position);
    }

    /// Forget the cursor position, e.g. when it leaves the window
    pub fn clear_mouse_position(&mut self) {
        self.mouse_position = None;
    }

    /// Process a wheel movement in lines
    pub fn process_scroll_lines(&mut self, lines: f32) {
        self.scroll_lines += lines;
    }

    /// Process a touchpad scroll in pixels
    pub fn process_scroll_pixels(&mut self, pixels: f32) {
        self.scroll_lines += pixels / PIXELS_PER_LINE;
    }

    /// Check if a key is currently pressed
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Check if a key was just pressed this frame
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed_keys.contains(&key)
    }

    /// Check if a mouse button is currently pressed
    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_mouse_buttons.contains(&button)
    }

    /// Get current mouse position
    pub fn mouse_position(&self) -> Option<Vec2> {
        self.mouse_position
    }

    /// Cursor movement with a button held, this frame
    pub fn drag_delta(&self) -> Vec2 {
        self.drag_delta
    }

    /// Wheel lines this frame
    pub fn scroll_lines(&self) -> f32 {
        self.scroll_lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_without_button_does_not_drag() {
        let mut input = Input::new();
        input.process_mouse_motion(Vec2::new(10.0, 10.0));
        input.process_mouse_motion(Vec2::new(20.0, 15.0));
        assert_eq!(input.drag_delta(), Vec2::ZERO);

        input.process_mouse_button(MouseButton::Left, ElementState::Pressed);
        input.process_mouse_motion(Vec2::new(25.0, 5.0));
        assert_eq!(input.drag_delta(), Vec2::new(5.0, -10.0));

        input.update();
        assert_eq!(input.drag_delta(), Vec2::ZERO);
        assert!(input.is_mouse_button_pressed(MouseButton::Left));
    }

    #[test]
    fn test_key_just_pressed_once() {
        let mut input = Input::new();
        input.process_keyboard(KeyCode::KeyH, ElementState::Pressed);
        assert!(input.is_key_just_pressed(KeyCode::KeyH));

        input.update();
        input.process_keyboard(KeyCode::KeyH, ElementState::Pressed);
        assert!(!input.is_key_just_pressed(KeyCode::KeyH));
        assert!(input.is_key_pressed(KeyCode::KeyH));
    }

    #[test]
    fn test_pixel_scroll_converts_to_lines() {
        let mut input = Input::new();
        input.process_scroll_lines(1.0);
        input.process_scroll_pixels(-80.0);
        assert_eq!(input.scroll_lines(), -1.0);
    }
}
