//! Pointer and wheel events delivered to the editor.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Ctrl on most platforms, Cmd on macOS; trackpad pinch also sets it.
    pub fn zoom_chord(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event in viewport (pointer-space) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        modifiers: Modifiers,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
    },
    Wheel {
        position: Point,
        delta: Vec2,
        modifiers: Modifiers,
    },
    /// Pointer left the drawing surface.
    Leave,
    /// Window lost keyboard/pointer focus.
    FocusLost,
}

impl PointerEvent {
    /// Whether this event terminates any drag in progress.
    pub fn ends_interaction(&self) -> bool {
        matches!(
            self,
            PointerEvent::Up { .. } | PointerEvent::Leave | PointerEvent::FocusLost
        )
    }
}
