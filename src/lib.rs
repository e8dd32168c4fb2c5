//! sceneplay library.
//!
//! Frame-driven behavior runtime for scene editors: property animations,
//! millisecond timers, tag-addressed messaging, a script-built control panel
//! and edge-triggered input, all exposed to sandboxed Lua scripts attached to
//! scene objects.
//!
//! - [`engine`] – [`engine::GameEngine`], the per-session orchestrator
//! - [`session`] – play-mode start/stop state machine
//! - [`resources`] – the managers, the object store and the Lua layer
//! - [`components`] – scene object components stored in the ECS world
//! - [`events`] – data exchanged with the host (input, GUI, audio, host commands)
//! - [`systems`] – easing math and the audio thread

pub mod components;
pub mod engine;
pub mod error;
pub mod events;
pub mod resources;
pub mod session;
pub mod systems;
