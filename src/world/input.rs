//! Input events produced by the capture layer (keyboard, pointer lock).
//!
//! Key codes follow the browser `KeyboardEvent.code` naming so a capture
//! layer can forward them untouched.

use bitflags::bitflags;

bitflags! {
    /// Held movement keys.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MovementFlags: u8 {
        const FORWARD = 1 << 0;
        const BACKWARD = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const RUNNING = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Press(MovementFlags),
    Release(MovementFlags),
    Jump,
    Respawn,
    ToggleCamera,
    /// Horizontal pointer movement in pixels while the pointer is locked.
    Look { dx: f32 },
}

fn movement_key(code: &str) -> Option<MovementFlags> {
    match code {
        "ArrowUp" | "KeyW" => Some(MovementFlags::FORWARD),
        "ArrowDown" | "KeyS" => Some(MovementFlags::BACKWARD),
        "ArrowLeft" | "KeyA" => Some(MovementFlags::LEFT),
        "ArrowRight" | "KeyD" => Some(MovementFlags::RIGHT),
        "ShiftLeft" | "ShiftRight" => Some(MovementFlags::RUNNING),
        _ => None,
    }
}

impl InputEvent {
    pub fn from_key_down(code: &str) -> Option<Self> {
        match code {
            "Space" => Some(Self::Jump),
            "KeyR" => Some(Self::Respawn),
            "KeyC" => Some(Self::ToggleCamera),
            other => movement_key(other).map(Self::Press),
        }
    }

    /// Releasing Space does nothing: a jump runs until gravity lands it.
    pub fn from_key_up(code: &str) -> Option<Self> {
        movement_key(code).map(Self::Release)
    }

    /// Parse one line of the text input protocol used by the headless driver:
    /// `down <code>`, `up <code>` or `look <dx>`.
    pub fn parse_command(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let verb = parts.next()?;
        let arg = parts.next()?;
        match verb {
            "down" => Self::from_key_down(arg),
            "up" => Self::from_key_up(arg),
            "look" => arg
                .parse::<f32>()
                .ok()
                .filter(|dx| dx.is_finite())
                .map(|dx| Self::Look { dx }),
            _ => None,
        }
    }
}
