//! Data exchanged between the runtime and its host.
//!
//! Submodules:
//! - [`audio`] – commands and messages for the background audio thread
//! - [`gui`] – interaction reported by the GUI renderer
//! - [`host`] – requests from scripts that only the host can fulfil
//! - [`input`] – raw device events and pointer events on objects
pub mod audio;
pub mod gui;
pub mod host;
pub mod input;
