//! Declarative control panel built by scripts at play time.
//!
//! [`GuiManager`] owns an ordered registry of [`GuiElement`]s grouped into named
//! containers. Scripts add buttons, sliders, toggles, text labels and text
//! inputs; the host renders whatever the latest [`GuiSnapshot`] describes and
//! routes user interaction back through [`GuiManager::trigger_element`].
//!
//! Every mutation pushes a fresh snapshot to all observers, either closures
//! registered with [`GuiManager::subscribe`] or channels obtained from
//! [`GuiManager::subscribe_channel`] for renderers living on another thread.
//! There is no polling API for change detection.
//!
//! Element ids (`gui-N`) are unique across the whole registry.

use crate::error::ScriptError;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::warn;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use std::cell::RefCell;
use std::rc::Rc;

/// Container used when a script does not name one.
pub const DEFAULT_CONTAINER: &str = "default";
pub const DEFAULT_SLIDER_STEP: f64 = 0.1;

pub type GuiElementId = String;

/// Value carried by a control or passed to its callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GuiValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Kind-specific data of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GuiControl {
    Button,
    Slider {
        value: f64,
        min: f64,
        max: f64,
        step: f64,
    },
    Toggle {
        value: bool,
    },
    Text,
    Input {
        value: String,
    },
}

/// One control as seen by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuiElement {
    pub id: GuiElementId,
    pub label: String,
    #[serde(flatten)]
    pub control: GuiControl,
}

impl GuiElement {
    /// Stored value, if the control has one.
    pub fn value(&self) -> Option<GuiValue> {
        match &self.control {
            GuiControl::Slider { value, .. } => Some(GuiValue::Number(*value)),
            GuiControl::Toggle { value } => Some(GuiValue::Bool(*value)),
            GuiControl::Input { value } => Some(GuiValue::Text(value.clone())),
            GuiControl::Button | GuiControl::Text => None,
        }
    }

    fn set_value(&mut self, new: &GuiValue) -> bool {
        match (&mut self.control, new) {
            (GuiControl::Slider { value, .. }, GuiValue::Number(n)) => *value = *n,
            (GuiControl::Toggle { value }, GuiValue::Bool(b)) => *value = *b,
            (GuiControl::Input { value }, GuiValue::Text(s)) => *value = s.clone(),
            (GuiControl::Input { value }, GuiValue::Number(n)) => *value = n.to_string(),
            _ => return false,
        }
        true
    }
}

/// Partial update applied by [`GuiManager::update_element`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GuiElementUpdate {
    pub label: Option<String>,
    pub value: Option<GuiValue>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

/// Full registry state pushed to observers after every mutation.
///
/// Serializes as `{"containers": {name: [ids]}, "elements": {id: element}}`
/// with containers and elements in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuiSnapshot {
    pub containers: Vec<(String, Vec<GuiElementId>)>,
    pub elements: Vec<GuiElement>,
}

impl GuiSnapshot {
    pub fn container(&self, name: &str) -> Option<&[GuiElementId]> {
        self.containers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ids)| ids.as_slice())
    }

    pub fn element(&self, id: &str) -> Option<&GuiElement> {
        self.elements.iter().find(|e| e.id == id)
    }
}

struct ContainersMap<'a>(&'a [(String, Vec<GuiElementId>)]);

impl Serialize for ContainersMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, ids) in self.0 {
            map.serialize_entry(name, ids)?;
        }
        map.end()
    }
}

struct ElementsMap<'a>(&'a [GuiElement]);

impl Serialize for ElementsMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for element in self.0 {
            map.serialize_entry(&element.id, element)?;
        }
        map.end()
    }
}

impl Serialize for GuiSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("GuiSnapshot", 2)?;
        s.serialize_field("containers", &ContainersMap(&self.containers))?;
        s.serialize_field("elements", &ElementsMap(&self.elements))?;
        s.end()
    }
}

/// Invoked on user interaction; buttons receive `None`.
pub type GuiCallback = Rc<dyn Fn(Option<GuiValue>) -> Result<(), ScriptError>>;
pub type GuiObserver = Rc<dyn Fn(&GuiSnapshot)>;
pub type SubscriptionId = u32;

struct Entry {
    element: GuiElement,
    callback: Option<GuiCallback>,
}

#[derive(Default)]
struct GuiState {
    entries: Vec<Entry>,
    containers: Vec<(String, Vec<GuiElementId>)>,
    next_id: u32,
    observers: Vec<(SubscriptionId, GuiObserver)>,
    channels: Vec<Sender<GuiSnapshot>>,
    next_subscription: SubscriptionId,
}

impl GuiState {
    fn snapshot(&self) -> GuiSnapshot {
        GuiSnapshot {
            containers: self.containers.clone(),
            elements: self.entries.iter().map(|e| e.element.clone()).collect(),
        }
    }

    fn entry_mut(&mut self, id: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.element.id == id)
    }
}

/// Registry of script-built controls.
pub struct GuiManager {
    state: RefCell<GuiState>,
    default_step: f64,
}

impl Default for GuiManager {
    fn default() -> Self {
        Self::new()
    }
}

impl GuiManager {
    pub fn new() -> Self {
        Self::with_default_step(DEFAULT_SLIDER_STEP)
    }

    /// Create a manager whose sliders default to `step`.
    pub fn with_default_step(step: f64) -> Self {
        let state = GuiState {
            containers: vec![(DEFAULT_CONTAINER.to_string(), Vec::new())],
            ..GuiState::default()
        };
        Self {
            state: RefCell::new(state),
            default_step: step,
        }
    }

    /// Register a closure called with every new snapshot.
    pub fn subscribe(&self, observer: impl Fn(&GuiSnapshot) + 'static) -> SubscriptionId {
        self.subscribe_shared(Rc::new(observer))
    }

    /// Same as [`subscribe`](Self::subscribe) for an observer the caller
    /// also keeps, e.g. to register it again on the next play session.
    pub fn subscribe_shared(&self, observer: GuiObserver) -> SubscriptionId {
        let mut state = self.state.borrow_mut();
        state.next_subscription += 1;
        let id = state.next_subscription;
        state.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.state.borrow_mut().observers.retain(|(sid, _)| *sid != id);
    }

    /// Receive snapshots over a channel. The sender is dropped once the
    /// receiver goes away.
    pub fn subscribe_channel(&self) -> Receiver<GuiSnapshot> {
        let (tx, rx) = unbounded();
        self.subscribe_sender(tx);
        rx
    }

    /// Push snapshots into an existing channel.
    pub fn subscribe_sender(&self, tx: Sender<GuiSnapshot>) {
        self.state.borrow_mut().channels.push(tx);
    }

    pub fn observer_count(&self) -> usize {
        let state = self.state.borrow();
        state.observers.len() + state.channels.len()
    }

    fn notify(&self) {
        let (snapshot, observers) = {
            let state = self.state.borrow();
            if state.observers.is_empty() && state.channels.is_empty() {
                return;
            }
            let observers: Vec<GuiObserver> = state.observers.iter().map(|(_, o)| o.clone()).collect();
            (state.snapshot(), observers)
        };
        self.state
            .borrow_mut()
            .channels
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
        for observer in observers {
            observer(&snapshot);
        }
    }

    fn insert(
        &self,
        label: &str,
        control: GuiControl,
        callback: Option<GuiCallback>,
        container: Option<&str>,
    ) -> GuiElementId {
        let container = container.unwrap_or(DEFAULT_CONTAINER);
        let id = {
            let mut state = self.state.borrow_mut();
            state.next_id += 1;
            let id = format!("gui-{}", state.next_id);
            state.entries.push(Entry {
                element: GuiElement {
                    id: id.clone(),
                    label: label.to_string(),
                    control,
                },
                callback,
            });
            match state.containers.iter_mut().find(|(n, _)| n.as_str() == container) {
                Some((_, ids)) => ids.push(id.clone()),
                None => state.containers.push((container.to_string(), vec![id.clone()])),
            }
            id
        };
        self.notify();
        id
    }

    pub fn add_button(&self, label: &str, callback: GuiCallback, container: Option<&str>) -> GuiElementId {
        self.insert(label, GuiControl::Button, Some(callback), container)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_slider(
        &self,
        label: &str,
        min: f64,
        max: f64,
        value: f64,
        callback: GuiCallback,
        step: Option<f64>,
        container: Option<&str>,
    ) -> GuiElementId {
        let control = GuiControl::Slider {
            value,
            min,
            max,
            step: step.unwrap_or(self.default_step),
        };
        self.insert(label, control, Some(callback), container)
    }

    pub fn add_toggle(
        &self,
        label: &str,
        value: bool,
        callback: GuiCallback,
        container: Option<&str>,
    ) -> GuiElementId {
        self.insert(label, GuiControl::Toggle { value }, Some(callback), container)
    }

    pub fn add_text(&self, text: &str, container: Option<&str>) -> GuiElementId {
        self.insert(text, GuiControl::Text, None, container)
    }

    pub fn add_input(
        &self,
        label: &str,
        value: &str,
        callback: GuiCallback,
        container: Option<&str>,
    ) -> GuiElementId {
        let control = GuiControl::Input {
            value: value.to_string(),
        };
        self.insert(label, control, Some(callback), container)
    }

    /// Remove an element from the registry and from every container.
    pub fn remove_element(&self, id: &str) {
        {
            let mut state = self.state.borrow_mut();
            state.entries.retain(|e| e.element.id != id);
            for (_, ids) in state.containers.iter_mut() {
                ids.retain(|i| i != id);
            }
        }
        self.notify();
    }

    /// Remove every element of one container; the container itself stays.
    pub fn clear_container(&self, name: &str) {
        {
            let mut state = self.state.borrow_mut();
            let removed = match state.containers.iter_mut().find(|(n, _)| n.as_str() == name) {
                Some((_, ids)) => std::mem::take(ids),
                None => Vec::new(),
            };
            state.entries.retain(|e| !removed.contains(&e.element.id));
        }
        self.notify();
    }

    /// Remove every element; container names are kept.
    pub fn clear_all(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.entries.clear();
            for (_, ids) in state.containers.iter_mut() {
                ids.clear();
            }
        }
        self.notify();
    }

    /// Elements of a container in insertion order.
    pub fn get_elements(&self, container: &str) -> Vec<GuiElement> {
        let state = self.state.borrow();
        let Some((_, ids)) = state.containers.iter().find(|(n, _)| n == container) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| state.entries.iter().find(|e| &e.element.id == id))
            .map(|e| e.element.clone())
            .collect()
    }

    pub fn get_element(&self, id: &str) -> Option<GuiElement> {
        self.state
            .borrow()
            .entries
            .iter()
            .find(|e| e.element.id == id)
            .map(|e| e.element.clone())
    }

    pub fn get_all_containers(&self) -> Vec<String> {
        self.state
            .borrow()
            .containers
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn snapshot(&self) -> GuiSnapshot {
        self.state.borrow().snapshot()
    }

    /// Apply a partial update. Fields that do not apply to the element's kind
    /// are ignored with a warning. Unknown ids are a no-op.
    pub fn update_element(&self, id: &str, update: GuiElementUpdate) {
        {
            let mut state = self.state.borrow_mut();
            let Some(entry) = state.entry_mut(id) else {
                return;
            };
            let element = &mut entry.element;
            if let Some(label) = update.label {
                element.label = label;
            }
            if let Some(value) = &update.value {
                if !element.set_value(value) {
                    warn!("GUI element {} ignored value {:?}", id, value);
                }
            }
            if let GuiControl::Slider { min, max, step, .. } = &mut element.control {
                if let Some(v) = update.min {
                    *min = v;
                }
                if let Some(v) = update.max {
                    *max = v;
                }
                if let Some(v) = update.step {
                    *step = v;
                }
            }
        }
        self.notify();
    }

    /// Simulate user interaction with an element.
    ///
    /// A provided `value` is stored on the element first (observers are
    /// notified), then the callback runs with that value, or with the stored
    /// value when none was given. Elements without a callback are a no-op.
    pub fn trigger_element(&self, id: &str, value: Option<GuiValue>) {
        let (callback, arg, changed) = {
            let mut state = self.state.borrow_mut();
            let Some(entry) = state.entry_mut(id) else {
                return;
            };
            let changed = match &value {
                Some(v) => entry.element.set_value(v),
                None => false,
            };
            let arg = value.or_else(|| entry.element.value());
            (entry.callback.clone(), arg, changed)
        };
        if changed {
            self.notify();
        }
        if let Some(callback) = callback {
            if let Err(err) = callback(arg) {
                warn!("GUI element callback error ({}): {}", id, err);
            }
        }
    }

    /// Drop all elements, containers and callbacks; observers stay subscribed.
    pub fn reset(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.entries.clear();
            state.containers = vec![(DEFAULT_CONTAINER.to_string(), Vec::new())];
        }
        self.notify();
    }
}
