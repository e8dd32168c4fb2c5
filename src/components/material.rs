//! Surface appearance of a scene object.
//!
//! Colors are normalized RGB triples. Scripts can also get and set them as
//! `#rrggbb` hex strings through [`Rgb::from_hex`] and [`Rgb::to_hex`].

use bevy_ecs::prelude::Component;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Normalized RGB color, each channel in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb` or `0xrrggbb`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s
            .trim()
            .trim_start_matches('#')
            .trim_start_matches("0x");
        if digits.len() != 6 {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        Some(Self::from_u32(value))
    }

    pub fn from_u32(value: u32) -> Self {
        let channel = |shift: u32| ((value >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    pub fn to_u32(self) -> u32 {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    pub fn to_hex(self) -> String {
        format!("#{:06x}", self.to_u32())
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    pub fn from_vec3(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Color and opacity of the object's mesh.
#[derive(Component, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub color: Rgb,
    /// Opacity in [0, 1].
    pub opacity: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Rgb::new(0.7, 0.7, 0.7),
            opacity: 1.0,
        }
    }
}
