use bevy_ecs::prelude::Component;

/// Per-object behavior script source, run once per frame during play.
#[derive(Component, Clone, Debug, Default, PartialEq, Eq)]
pub struct Script(pub String);

impl Script {
    /// Empty or whitespace-only scripts are skipped by the engine.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Whether the object's mesh is rendered.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visible(pub bool);

impl Default for Visible {
    fn default() -> Self {
        Visible(true)
    }
}
