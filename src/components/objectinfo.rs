//! Identity and geometry of a scene object.

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

/// Editor-assigned identifier, stable for the whole play session.
#[derive(Component, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub String);

/// Display name, used by `scene.getObjectByName`.
#[derive(Component, Clone, Debug, PartialEq, Eq)]
pub struct ObjectName(pub String);

/// Geometry kind of the mesh backing the object.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Geometry {
    #[default]
    #[serde(alias = "cube")]
    Box,
    Sphere,
    Plane,
}

impl Geometry {
    pub fn as_str(self) -> &'static str {
        match self {
            Geometry::Box => "box",
            Geometry::Sphere => "sphere",
            Geometry::Plane => "plane",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_accepts_cube_alias() {
        let g: Geometry = serde_json::from_str("\"cube\"").unwrap();
        assert_eq!(g, Geometry::Box);
        let g: Geometry = serde_json::from_str("\"plane\"").unwrap();
        assert_eq!(g.as_str(), "plane");
    }
}
