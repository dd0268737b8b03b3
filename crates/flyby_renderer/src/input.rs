//! Input snapshot consumed by the fly camera.
//!
//! The viewer translates platform events into this struct, keeping the
//! camera independent of any windowing library.

use flyby_math::Vec2;

/// The six movement keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKey {
    Forward,
    Backward,
    Left,
    Right,
    Down,
    Up,
}

impl MovementKey {
    pub const ALL: [MovementKey; 6] = [
        MovementKey::Forward,
        MovementKey::Backward,
        MovementKey::Left,
        MovementKey::Right,
        MovementKey::Down,
        MovementKey::Up,
    ];
}

/// Current state of the keys, the look button and the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    keys: [bool; 6],
    /// Mouse-look button held
    pub look: bool,
    /// Cursor position in window pixels
    pub mouse_position: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press or release.
    pub fn set_key(&mut self, key: MovementKey, pressed: bool) {
        self.keys[key as usize] = pressed;
    }

    pub fn is_down(&self, key: MovementKey) -> bool {
        self.keys[key as usize]
    }

    pub fn any_key_down(&self) -> bool {
        self.keys.iter().any(|&down| down)
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys = [false; 6];
        self.look = false;
    }
}
