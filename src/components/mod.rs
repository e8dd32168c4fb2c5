//! ECS components of a scene object.
//!
//! Every live object is one entity in [`crate::resources::sceneworld::SceneWorld`]
//! carrying the components below.
//!
//! Submodules overview:
//! - [`material`] – normalized RGB color and opacity
//! - [`objectinfo`] – id, display name and geometry kind
//! - [`property`] – dotted property paths and the values they carry
//! - [`script`] – behavior script source and visibility flag
//! - [`tags`] – free-form labels used for messaging and lookups
//! - [`transform`] – position, Euler rotation and scale

pub mod material;
pub mod objectinfo;
pub mod property;
pub mod script;
pub mod tags;
pub mod transform;
