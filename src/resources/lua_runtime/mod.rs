//! Lua scripting layer of a play session.
//!
//! Scripts never see the managers directly. They receive capability tables
//! (`engine`, `scene`, `input`, `gui`) and, for object scripts, an `object`
//! record and a live `mesh` handle.
//!
//! # Architecture
//!
//! - [`runtime`] - sandboxed Lua state, script compilation and `engine.wait`
//! - [`context`] - shared session state and resumable script invocation
//! - [`api`] - the capability tables and the per-object records
//! - [`mesh`] - userdata wrapping an object's transform and material
//! - [`convert`] - value conversions between Lua, JSON and property values

mod api;
mod context;
mod convert;
mod mesh;
mod runtime;

pub use api::ApiTables;
pub(crate) use api::{object_record, slot_message_handler, timer_callback};
pub use context::PlayContext;
pub use mesh::{LuaColor, LuaMaterial, LuaMesh, LuaVec3};
pub use runtime::{GLOBAL_SCRIPT_PARAMS, LuaRuntime, OBJECT_SCRIPT_PARAMS};
