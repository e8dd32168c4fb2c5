//! Per-frame computations shared by the managers.
//!
//! Submodules overview
//! - [`audio`] – the background audio thread loop
//! - [`tween`] – easing curves and number, vector and rotation interpolation

pub mod audio;
pub mod tween;
