//! Requests from scripts that only the host application can fulfil.
//!
//! Scripts ask for things like spawning new objects or changing the physics
//! gravity. The runtime does not own a renderer or a physics world, so these
//! requests are queued and handed to the host after each frame through
//! [`crate::engine::GameEngine::drain_host_commands`].

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostCmd {
    /// Spawn a new object of `object_type` with free-form options.
    Spawn { object_type: String, options: Value },
    SetGravity { x: f32, y: f32, z: f32 },
    /// Restart the play session from the editor's saved state.
    Restart,
}
