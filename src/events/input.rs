//! Raw input events forwarded by the host.
//!
//! The host translates whatever windowing layer it uses into [`InputEvent`]s
//! and hands them to [`InputManager::handle_event`]. Key codes use the
//! physical-key naming (`KeyA`, `Digit1`, `ArrowLeft`, `ShiftLeft`, ...).
//!
//! [`InputManager::handle_event`]: crate::resources::input::InputManager::handle_event

use serde::{Deserialize, Serialize};

/// A single device event between two frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    KeyDown { code: String },
    KeyUp { code: String },
    MouseDown { button: u32 },
    MouseUp { button: u32 },
    MouseMove { x: f32, y: f32 },
}

impl InputEvent {
    pub fn key_down(code: impl Into<String>) -> Self {
        InputEvent::KeyDown { code: code.into() }
    }

    pub fn key_up(code: impl Into<String>) -> Self {
        InputEvent::KeyUp { code: code.into() }
    }
}

/// Pointer interaction on a scene object, routed to the object's handler slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerEvent {
    /// `object.onClick()`
    Click,
    /// `object.onHoverEnter()`
    HoverEnter,
    /// `object.onHoverExit()`
    HoverExit,
}

impl PointerEvent {
    /// Name of the script slot that receives this event.
    pub fn slot(self) -> &'static str {
        match self {
            PointerEvent::Click => "onClick",
            PointerEvent::HoverEnter => "onHoverEnter",
            PointerEvent::HoverExit => "onHoverExit",
        }
    }
}
