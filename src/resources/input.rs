//! Per-frame input state with edge detection.
//!
//! [`InputManager`] keeps the set of keys and pointer buttons currently held,
//! the last pointer position and a snapshot of connected gamepads. Press and
//! release edges are collected from host events between frames and become
//! visible on the next [`InputManager::update`], where they stay visible for
//! exactly that one frame.
//!
//! Script-facing lookups accept friendly names: single letters (`"a"`),
//! digits (`"1"`), a few named keys (`"Shift"`, `"Space"`, ...) and the
//! mouse/gamepad names in [`mouse_button_index`], [`gamepad_axis_index`] and
//! [`gamepad_button_index`].

use crate::events::input::InputEvent;
use arrayvec::ArrayVec;
use rustc_hash::FxHashSet;

/// Maximum number of gamepads tracked at once.
pub const MAX_GAMEPADS: usize = 4;
/// Axes stored per gamepad.
pub const MAX_AXES: usize = 8;
/// Buttons stored per gamepad (standard layout plus the home button).
pub const MAX_BUTTONS: usize = 17;

/// Snapshot of one connected gamepad.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadState {
    pub axes: ArrayVec<f32, MAX_AXES>,
    pub buttons: ArrayVec<bool, MAX_BUTTONS>,
}

/// Supplies gamepad snapshots once per frame.
pub trait GamepadSource {
    fn poll(&mut self) -> ArrayVec<GamepadState, MAX_GAMEPADS>;
}

/// Source used when the host has no gamepad support.
#[derive(Debug, Default)]
pub struct NoGamepads;

impl GamepadSource for NoGamepads {
    fn poll(&mut self) -> ArrayVec<GamepadState, MAX_GAMEPADS> {
        ArrayVec::new()
    }
}

/// Either a raw index or a friendly name, as accepted by scripts.
#[derive(Debug, Clone, Copy)]
pub enum InputRef<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for InputRef<'_> {
    fn from(i: usize) -> Self {
        InputRef::Index(i)
    }
}

impl<'a> From<&'a str> for InputRef<'a> {
    fn from(s: &'a str) -> Self {
        InputRef::Name(s)
    }
}

/// Convert a friendly key name into a physical key code.
///
/// Unrecognized strings are returned unchanged so that hosts can use raw
/// codes such as `"F5"` or `"ShiftRight"` directly.
pub fn normalize_key(key: &str) -> String {
    let mut chars = key.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return format!("Key{}", c.to_ascii_uppercase());
        }
        if c.is_ascii_digit() {
            return format!("Digit{c}");
        }
    }
    match key {
        "Shift" => "ShiftLeft".to_string(),
        "Control" => "ControlLeft".to_string(),
        "Alt" => "AltLeft".to_string(),
        // ArrowLeft/Right/Up/Down, Space, Enter, Escape, Tab, Backspace map to themselves
        other => other.to_string(),
    }
}

/// `left`/`middle`/`right` (case-insensitive) to 0/1/2; unknown names map to 0.
pub fn mouse_button_index(name: &str) -> usize {
    match name.to_ascii_lowercase().as_str() {
        "left" => 0,
        "middle" => 1,
        "right" => 2,
        _ => 0,
    }
}

/// `x`/`y`/`rx`/`ry` to 0..=3; unknown names map to 0.
pub fn gamepad_axis_index(name: &str) -> usize {
    match name.to_ascii_lowercase().as_str() {
        "x" => 0,
        "y" => 1,
        "rx" => 2,
        "ry" => 3,
        _ => 0,
    }
}

/// Standard 16-button layout; unknown names map to 0.
pub fn gamepad_button_index(name: &str) -> usize {
    match name.to_ascii_lowercase().as_str() {
        "a" => 0,
        "b" => 1,
        "x" => 2,
        "y" => 3,
        "lb" => 4,
        "rb" => 5,
        "lt" => 6,
        "rt" => 7,
        "select" => 8,
        "start" => 9,
        "ls" => 10,
        "rs" => 11,
        "up" => 12,
        "down" => 13,
        "left" => 14,
        "right" => 15,
        _ => 0,
    }
}

/// Keyboard, pointer and gamepad state for the running play session.
pub struct InputManager {
    keys: FxHashSet<String>,
    pressed: FxHashSet<String>,
    released: FxHashSet<String>,
    pending_pressed: FxHashSet<String>,
    pending_released: FxHashSet<String>,
    mouse_buttons: FxHashSet<usize>,
    mouse_position: (f32, f32),
    gamepads: ArrayVec<GamepadState, MAX_GAMEPADS>,
    gamepad_source: Box<dyn GamepadSource>,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InputManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputManager")
            .field("keys", &self.keys)
            .field("pressed", &self.pressed)
            .field("released", &self.released)
            .field("mouse_buttons", &self.mouse_buttons)
            .field("mouse_position", &self.mouse_position)
            .field("gamepads", &self.gamepads.len())
            .finish()
    }
}

impl InputManager {
    pub fn new() -> Self {
        Self::with_gamepad_source(Box::new(NoGamepads))
    }

    pub fn with_gamepad_source(source: Box<dyn GamepadSource>) -> Self {
        Self {
            keys: FxHashSet::default(),
            pressed: FxHashSet::default(),
            released: FxHashSet::default(),
            pending_pressed: FxHashSet::default(),
            pending_released: FxHashSet::default(),
            mouse_buttons: FxHashSet::default(),
            mouse_position: (0.0, 0.0),
            gamepads: ArrayVec::new(),
            gamepad_source: source,
        }
    }

    pub fn set_gamepad_source(&mut self, source: Box<dyn GamepadSource>) {
        self.gamepad_source = source;
    }

    /// Feed one host event. Edges become visible on the next [`update`](Self::update).
    pub fn handle_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown { code } => {
                if self.keys.insert(code.clone()) {
                    self.pending_pressed.insert(code.clone());
                }
            }
            InputEvent::KeyUp { code } => {
                if self.keys.remove(code) {
                    self.pending_released.insert(code.clone());
                }
            }
            InputEvent::MouseDown { button } => {
                self.mouse_buttons.insert(*button as usize);
            }
            InputEvent::MouseUp { button } => {
                self.mouse_buttons.remove(&(*button as usize));
            }
            InputEvent::MouseMove { x, y } => {
                self.mouse_position = (*x, *y);
            }
        }
    }

    /// Start a new frame: drop last frame's edges, expose the pending ones
    /// and refresh the gamepad snapshot.
    pub fn update(&mut self) {
        self.pressed.clear();
        self.released.clear();
        std::mem::swap(&mut self.pressed, &mut self.pending_pressed);
        std::mem::swap(&mut self.released, &mut self.pending_released);
        self.gamepads = self.gamepad_source.poll();
    }

    pub fn is_key_down(&self, key: &str) -> bool {
        self.keys.contains(&normalize_key(key))
    }

    pub fn was_key_pressed(&self, key: &str) -> bool {
        self.pressed.contains(&normalize_key(key))
    }

    pub fn was_key_released(&self, key: &str) -> bool {
        self.released.contains(&normalize_key(key))
    }

    pub fn is_mouse_down<'a>(&self, button: impl Into<InputRef<'a>>) -> bool {
        let index = match button.into() {
            InputRef::Index(i) => i,
            InputRef::Name(n) => mouse_button_index(n),
        };
        self.mouse_buttons.contains(&index)
    }

    pub fn mouse_position(&self) -> (f32, f32) {
        self.mouse_position
    }

    /// Axis value in [-1, 1]; 0 when the pad or axis is missing.
    pub fn gamepad_axis<'a>(&self, pad: usize, axis: impl Into<InputRef<'a>>) -> f32 {
        let index = match axis.into() {
            InputRef::Index(i) => i,
            InputRef::Name(n) => gamepad_axis_index(n),
        };
        self.gamepads
            .get(pad)
            .and_then(|g| g.axes.get(index).copied())
            .unwrap_or(0.0)
    }

    pub fn gamepad_button<'a>(&self, pad: usize, button: impl Into<InputRef<'a>>) -> bool {
        let index = match button.into() {
            InputRef::Index(i) => i,
            InputRef::Name(n) => gamepad_button_index(n),
        };
        self.gamepads
            .get(pad)
            .and_then(|g| g.buttons.get(index).copied())
            .unwrap_or(false)
    }

    pub fn gamepad_count(&self) -> usize {
        self.gamepads.len()
    }

    /// Forget all held keys and buttons.
    pub fn reset(&mut self) {
        self.keys.clear();
        self.pressed.clear();
        self.released.clear();
        self.pending_pressed.clear();
        self.pending_released.clear();
        self.mouse_buttons.clear();
        self.gamepads.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnePad;

    impl GamepadSource for OnePad {
        fn poll(&mut self) -> ArrayVec<GamepadState, MAX_GAMEPADS> {
            let mut pad = GamepadState::default();
            pad.axes.extend([0.5, -0.25, 0.0, 1.0]);
            for i in 0..16 {
                pad.buttons.push(i == 9);
            }
            let mut pads = ArrayVec::new();
            pads.push(pad);
            pads
        }
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("a"), "KeyA");
        assert_eq!(normalize_key("Z"), "KeyZ");
        assert_eq!(normalize_key("7"), "Digit7");
        assert_eq!(normalize_key("Shift"), "ShiftLeft");
        assert_eq!(normalize_key("Control"), "ControlLeft");
        assert_eq!(normalize_key("Alt"), "AltLeft");
        assert_eq!(normalize_key("ArrowUp"), "ArrowUp");
        assert_eq!(normalize_key("Space"), "Space");
        assert_eq!(normalize_key("F5"), "F5");
    }

    #[test]
    fn test_name_tables() {
        assert_eq!(mouse_button_index("Right"), 2);
        assert_eq!(mouse_button_index("middle"), 1);
        assert_eq!(mouse_button_index("thumb"), 0);
        assert_eq!(gamepad_axis_index("RY"), 3);
        assert_eq!(gamepad_button_index("start"), 9);
        assert_eq!(gamepad_button_index("right"), 15);
        assert_eq!(gamepad_button_index("home"), 0);
    }

    #[test]
    fn test_pressed_visible_for_exactly_one_frame() {
        let mut input = InputManager::new();
        input.handle_event(&InputEvent::key_down("KeyA"));
        assert!(!input.was_key_pressed("a"));
        input.update();
        assert!(input.was_key_pressed("a"));
        assert!(input.is_key_down("a"));
        input.update();
        assert!(!input.was_key_pressed("a"));
        assert!(input.is_key_down("a"));
    }

    #[test]
    fn test_key_repeat_does_not_retrigger_press() {
        let mut input = InputManager::new();
        input.handle_event(&InputEvent::key_down("Space"));
        input.update();
        input.handle_event(&InputEvent::key_down("Space"));
        input.update();
        assert!(!input.was_key_pressed("Space"));
    }

    #[test]
    fn test_release_edge() {
        let mut input = InputManager::new();
        input.handle_event(&InputEvent::key_down("ShiftLeft"));
        input.update();
        input.handle_event(&InputEvent::key_up("ShiftLeft"));
        input.update();
        assert!(input.was_key_released("Shift"));
        assert!(!input.is_key_down("Shift"));
        input.update();
        assert!(!input.was_key_released("Shift"));
    }

    #[test]
    fn test_mouse_buttons_and_position() {
        let mut input = InputManager::new();
        input.handle_event(&InputEvent::MouseDown { button: 2 });
        input.handle_event(&InputEvent::MouseMove { x: 10.0, y: 20.0 });
        assert!(input.is_mouse_down("right"));
        assert!(input.is_mouse_down(2usize));
        assert!(!input.is_mouse_down("left"));
        assert_eq!(input.mouse_position(), (10.0, 20.0));
        input.handle_event(&InputEvent::MouseUp { button: 2 });
        assert!(!input.is_mouse_down("right"));
    }

    #[test]
    fn test_gamepad_snapshot_refreshed_on_update() {
        let mut input = InputManager::with_gamepad_source(Box::new(OnePad));
        assert_eq!(input.gamepad_axis(0, "x"), 0.0);
        input.update();
        assert_eq!(input.gamepad_count(), 1);
        assert_eq!(input.gamepad_axis(0, "x"), 0.5);
        assert_eq!(input.gamepad_axis(0, "ry"), 1.0);
        assert!(input.gamepad_button(0, "start"));
        assert!(!input.gamepad_button(0, "a"));
        assert_eq!(input.gamepad_axis(1, "x"), 0.0);
        assert!(!input.gamepad_button(3, 9usize));
    }
}
