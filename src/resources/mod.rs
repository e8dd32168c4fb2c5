//! Long-lived state of a play session.
//!
//! Overview
//! - `animations` – property tweens toward a goal value
//! - `audio` – bridge and channels for the background audio thread
//! - `gui` – script-built control panel and its observers
//! - `input` – keyboard, pointer and gamepad state with edge detection
//! - `lua_runtime` – sandboxed Lua state and the capability tables
//! - `messages` – publish/subscribe between tagged objects
//! - `runtimeconfig` – INI configuration
//! - `sceneworld` – ECS-backed live object list
//! - `timers` – millisecond timeouts, intervals and waits
pub mod animations;
pub mod audio;
pub mod gui;
pub mod input;
pub mod lua_runtime;
pub mod messages;
pub mod runtimeconfig;
pub mod sceneworld;
pub mod timers;
