//! Keyboard bindings.

use flyby_renderer::MovementKey;
use winit::keyboard::KeyCode;

/// One-shot actions triggered on key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Restart accumulation from frame 1
    ResetAccumulation,
    ToggleAccumulation,
    Quit,
}

/// W/S forward and back, A/D strafe, Q/E down and up.
pub fn movement_key(code: KeyCode) -> Option<MovementKey> {
    match code {
        KeyCode::KeyW => Some(MovementKey::Forward),
        KeyCode::KeyS => Some(MovementKey::Backward),
        KeyCode::KeyA => Some(MovementKey::Left),
        KeyCode::KeyD => Some(MovementKey::Right),
        KeyCode::KeyQ => Some(MovementKey::Down),
        KeyCode::KeyE => Some(MovementKey::Up),
        _ => None,
    }
}

pub fn action(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::KeyR => Some(Action::ResetAccumulation),
        KeyCode::KeyT => Some(Action::ToggleAccumulation),
        KeyCode::Escape => Some(Action::Quit),
        _ => None,
    }
}
