// SPDX-License-Identifier: MIT OR Apache-2.0
//! Input polling.
//!
//! The session reads keys and the pointer through [`InputSource`].
//! [`FrameInput`] is a plain recorded snapshot of one frame, used by tests
//! and by the replay runner.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Keys and buttons the editor reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Strafe left
    A,
    /// Copy (with Control)
    C,
    /// Strafe right
    D,
    /// Move back
    S,
    /// Paste (with Control)
    V,
    /// Move forward
    W,
    /// Redo (with Control)
    Y,
    /// Undo (with Control)
    Z,
    /// Move up
    Space,
    /// Speed multiplier, multi-select modifier
    Shift,
    /// Move down, shortcut modifier
    Control,
    /// Delete selection
    Delete,
    /// Gizmo drag
    MouseLeft,
    /// Select
    MouseRight,
    /// Camera look
    MouseMiddle,
}

/// Per-frame input queries
pub trait InputSource {
    /// Whether the key is held this frame
    fn down(&self, key: Key) -> bool;

    /// Whether the key went down this frame
    fn pressed(&self, key: Key) -> bool;

    /// Pointer position in viewport pixels
    fn pointer(&self) -> Vec2;

    /// Pointer movement since the previous frame, in pixels
    fn pointer_delta(&self) -> Vec2;
}

/// Recorded input for one frame. Pressed keys also count as held.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameInput {
    /// Keys held
    pub down: Vec<Key>,
    /// Keys that went down this frame
    pub pressed: Vec<Key>,
    /// Pointer position
    pub pointer: Vec2,
    /// Pointer movement
    pub pointer_delta: Vec2,
}

impl FrameInput {
    /// Empty frame with the pointer at `pointer`
    pub fn at(pointer: Vec2) -> Self {
        Self {
            pointer,
            ..Default::default()
        }
    }

    /// Hold a key
    pub fn hold(mut self, key: Key) -> Self {
        if !self.down.contains(&key) {
            self.down.push(key);
        }
        self
    }

    /// Press a key this frame
    pub fn press(mut self, key: Key) -> Self {
        if !self.pressed.contains(&key) {
            self.pressed.push(key);
        }
        self
    }

    /// Set the pointer movement
    pub fn moved(mut self, delta: Vec2) -> Self {
        self.pointer_delta = delta;
        self
    }
}

impl InputSource for FrameInput {
    fn down(&self, key: Key) -> bool {
        self.down.contains(&key) || self.pressed.contains(&key)
    }

    fn pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    fn pointer(&self) -> Vec2 {
        self.pointer
    }

    fn pointer_delta(&self) -> Vec2 {
        self.pointer_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressed_counts_as_down() {
        let input = FrameInput::at(Vec2::new(10.0, 20.0))
            .press(Key::MouseRight)
            .hold(Key::Shift);
        assert!(input.down(Key::MouseRight));
        assert!(input.pressed(Key::MouseRight));
        assert!(input.down(Key::Shift));
        assert!(!input.pressed(Key::Shift));
        assert_eq!(input.pointer(), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn test_frame_from_ron() {
        let input: FrameInput = ron::from_str("(pressed: [Delete], pointer: (4.0, 2.0))").unwrap();
        assert!(input.pressed(Key::Delete));
        assert!(input.down.is_empty());
        assert_eq!(input.pointer_delta, Vec2::ZERO);
    }
}
