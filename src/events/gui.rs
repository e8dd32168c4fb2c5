//! Interaction reported by the host's GUI renderer.

use crate::resources::gui::GuiValue;
use serde::{Deserialize, Serialize};

/// The user clicked, dragged or edited the element `id`.
///
/// Without a `value` the element's stored value is passed to its callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuiTrigger {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<GuiValue>,
}

impl GuiTrigger {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: GuiValue) -> Self {
        self.value = Some(value);
        self
    }
}
