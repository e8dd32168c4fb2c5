//! Publish/subscribe messaging between scene objects.
//!
//! Objects register with a set of tags, then attach handlers per message type
//! (or `"*"` for every type). Messages can be addressed to one object, to all
//! objects carrying a tag, or broadcast to every registered object. Global
//! handlers observe every addressed delivery of their message type.
//!
//! Handlers run in registration order. A failing handler is logged and the
//! remaining handlers still run. Handlers may send further messages; the
//! nesting depth is bounded by [`MessageManager::with_max_depth`].
//!
//! # Payloads
//!
//! Object handlers receive the payload unchanged. Global handlers receive an
//! object payload extended with `sourceId` (the sender, or null when the host
//! sent it) and `targetId`. A non-object payload is wrapped as `{"value": ...}`
//! before the two ids are added.

use crate::components::tags::Tags;
use crate::error::ScriptError;
use log::warn;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Message type that matches every message.
pub const WILDCARD: &str = "*";

pub const DEFAULT_MAX_DEPTH: u32 = 32;

/// Handler id returned on registration, used for removal.
pub type HandlerId = u64;

/// `(message_type, data)`
pub type MessageHandler = Rc<dyn Fn(&str, &Value) -> Result<(), ScriptError>>;

struct Registration {
    id: HandlerId,
    message_type: String,
    handler: MessageHandler,
}

impl Registration {
    fn matches(&self, message_type: &str) -> bool {
        self.message_type == message_type || self.message_type == WILDCARD
    }
}

#[derive(Default)]
struct RegisteredObject {
    tags: Tags,
    handlers: Vec<Registration>,
}

#[derive(Default)]
struct MessageState {
    order: Vec<String>,
    objects: FxHashMap<String, RegisteredObject>,
    globals: Vec<Registration>,
    next_handler: HandlerId,
}

impl MessageState {
    fn next_id(&mut self) -> HandlerId {
        self.next_handler += 1;
        self.next_handler
    }
}

/// Tag-aware message router for one play session.
pub struct MessageManager {
    state: RefCell<MessageState>,
    depth: Cell<u32>,
    max_depth: u32,
}

impl Default for MessageManager {
    fn default() -> Self {
        Self::new()
    }
}

fn global_payload(data: &Value, source: Option<&str>, target: &str) -> Value {
    let mut map = match data {
        Value::Object(m) => m.clone(),
        Value::Null => Map::new(),
        other => {
            let mut m = Map::new();
            m.insert("value".to_string(), other.clone());
            m
        }
    };
    map.insert(
        "sourceId".to_string(),
        source.map_or(Value::Null, |s| Value::String(s.to_string())),
    );
    map.insert("targetId".to_string(), Value::String(target.to_string()));
    Value::Object(map)
}

impl MessageManager {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: u32) -> Self {
        Self {
            state: RefCell::default(),
            depth: Cell::new(0),
            max_depth: max_depth.max(1),
        }
    }

    /// Register (or re-tag) an object. Existing handlers are kept.
    pub fn register_object(&self, object_id: &str, tags: Tags) {
        let mut state = self.state.borrow_mut();
        if let Some(obj) = state.objects.get_mut(object_id) {
            obj.tags = tags;
            return;
        }
        state.order.push(object_id.to_string());
        state.objects.insert(
            object_id.to_string(),
            RegisteredObject {
                tags,
                handlers: Vec::new(),
            },
        );
    }

    /// Drop an object's handlers and tag membership.
    pub fn unregister_object(&self, object_id: &str) {
        let mut state = self.state.borrow_mut();
        if state.objects.remove(object_id).is_some() {
            state.order.retain(|id| id != object_id);
        }
    }

    pub fn is_registered(&self, object_id: &str) -> bool {
        self.state.borrow().objects.contains_key(object_id)
    }

    /// Attach a handler to a registered object. Returns `None` when the object
    /// is not registered.
    pub fn add_message_handler(
        &self,
        object_id: &str,
        message_type: &str,
        handler: MessageHandler,
    ) -> Option<HandlerId> {
        let mut state = self.state.borrow_mut();
        if !state.objects.contains_key(object_id) {
            warn!("Message handler for unregistered object '{}' ignored", object_id);
            return None;
        }
        let id = state.next_id();
        let obj = state.objects.get_mut(object_id)?;
        obj.handlers.push(Registration {
            id,
            message_type: message_type.to_string(),
            handler,
        });
        Some(id)
    }

    pub fn add_global_message_handler(&self, message_type: &str, handler: MessageHandler) -> HandlerId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.globals.push(Registration {
            id,
            message_type: message_type.to_string(),
            handler,
        });
        id
    }

    /// Remove one handler, object or global.
    pub fn remove_message_handler(&self, handler_id: HandlerId) {
        let mut state = self.state.borrow_mut();
        state.globals.retain(|r| r.id != handler_id);
        for obj in state.objects.values_mut() {
            obj.handlers.retain(|r| r.id != handler_id);
        }
    }

    /// Remove every handler of an object but keep it registered.
    pub fn remove_all_handlers(&self, object_id: &str) {
        if let Some(obj) = self.state.borrow_mut().objects.get_mut(object_id) {
            obj.handlers.clear();
        }
    }

    /// Registered objects carrying `tag`, in registration order.
    pub fn objects_with_tag(&self, tag: &str) -> Vec<String> {
        let state = self.state.borrow();
        state
            .order
            .iter()
            .filter(|id| state.objects.get(*id).is_some_and(|o| o.tags.has(tag)))
            .cloned()
            .collect()
    }

    /// Deliver a host-originated message to one object.
    pub fn send_message(&self, target_id: &str, message_type: &str, data: &Value) {
        self.send_message_from(None, target_id, message_type, data);
    }

    /// Deliver a message to one object, recording the sender for global handlers.
    pub fn send_message_from(
        &self,
        source: Option<&str>,
        target_id: &str,
        message_type: &str,
        data: &Value,
    ) {
        if self.depth.get() >= self.max_depth {
            warn!(
                "Message '{}' to '{}' dropped: dispatch depth limit {} reached",
                message_type, target_id, self.max_depth
            );
            return;
        }

        let (local, global): (Vec<MessageHandler>, Vec<MessageHandler>) = {
            let state = self.state.borrow();
            let local = state
                .objects
                .get(target_id)
                .map(|o| {
                    o.handlers
                        .iter()
                        .filter(|r| r.matches(message_type))
                        .map(|r| r.handler.clone())
                        .collect()
                })
                .unwrap_or_default();
            let global = state
                .globals
                .iter()
                .filter(|r| r.matches(message_type))
                .map(|r| r.handler.clone())
                .collect();
            (local, global)
        };

        self.depth.set(self.depth.get() + 1);
        for handler in local {
            if let Err(err) = handler(message_type, data) {
                warn!("Message handler error for {}:{}: {}", target_id, message_type, err);
            }
        }
        if !global.is_empty() {
            let payload = global_payload(data, source, target_id);
            for handler in global {
                if let Err(err) = handler(message_type, &payload) {
                    warn!("Global message handler error for {}: {}", message_type, err);
                }
            }
        }
        self.depth.set(self.depth.get() - 1);
    }

    /// Deliver to every object tagged `tag` at send time.
    pub fn send_message_to_tag(&self, source: Option<&str>, tag: &str, message_type: &str, data: &Value) {
        for target in self.objects_with_tag(tag) {
            self.send_message_from(source, &target, message_type, data);
        }
    }

    /// Deliver to every registered object.
    pub fn broadcast(&self, source: Option<&str>, message_type: &str, data: &Value) {
        let targets = self.state.borrow().order.clone();
        for target in targets {
            self.send_message_from(source, &target, message_type, data);
        }
    }

    /// Forget every object and handler.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.order.clear();
        state.objects.clear();
        state.globals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recorder(log: &Log, name: &str) -> MessageHandler {
        let log = log.clone();
        let name = name.to_string();
        Rc::new(move |t: &str, d: &Value| {
            log.borrow_mut().push(format!("{name}:{t}:{d}"));
            Ok(())
        })
    }

    fn tags(list: &[&str]) -> Tags {
        list.iter().copied().collect()
    }

    #[test]
    fn test_send_to_tag_reaches_only_tagged_objects() {
        let mm = MessageManager::new();
        let log: Log = Rc::default();
        mm.register_object("e1", tags(&["enemy"]));
        mm.register_object("e2", tags(&["enemy", "boss"]));
        mm.register_object("p1", tags(&["player"]));
        for id in ["e1", "e2", "p1"] {
            mm.add_message_handler(id, "takeDamage", recorder(&log, id));
        }
        mm.send_message_to_tag(None, "enemy", "takeDamage", &json!(10));
        assert_eq!(*log.borrow(), vec!["e1:takeDamage:10", "e2:takeDamage:10"]);

        log.borrow_mut().clear();
        mm.unregister_object("e1");
        mm.send_message_to_tag(None, "enemy", "takeDamage", &json!(10));
        assert_eq!(*log.borrow(), vec!["e2:takeDamage:10"]);
        assert_eq!(mm.objects_with_tag("enemy"), vec!["e2".to_string()]);
    }

    #[test]
    fn test_handlers_run_in_registration_order_with_wildcard() {
        let mm = MessageManager::new();
        let log: Log = Rc::default();
        mm.register_object("a", Tags::default());
        mm.add_message_handler("a", "ping", recorder(&log, "first"));
        mm.add_message_handler("a", WILDCARD, recorder(&log, "any"));
        mm.add_message_handler("a", "ping", recorder(&log, "second"));
        mm.add_message_handler("a", "pong", recorder(&log, "never"));
        mm.send_message("a", "ping", &Value::Null);
        assert_eq!(
            *log.borrow(),
            vec!["first:ping:null", "any:ping:null", "second:ping:null"]
        );
    }

    #[test]
    fn test_global_handler_gets_source_and_target() {
        let mm = MessageManager::new();
        let log: Log = Rc::default();
        mm.register_object("door", Tags::default());
        mm.add_global_message_handler("open", recorder(&log, "g"));
        mm.send_message_from(Some("key"), "door", "open", &json!({"force": 2}));
        mm.send_message("door", "open", &json!(true));
        let log = log.borrow();
        assert_eq!(log[0], r#"g:open:{"force":2,"sourceId":"key","targetId":"door"}"#);
        assert_eq!(log[1], r#"g:open:{"sourceId":null,"targetId":"door","value":true}"#);
    }

    #[test]
    fn test_failing_handler_does_not_block_others() {
        let mm = MessageManager::new();
        let log: Log = Rc::default();
        mm.register_object("a", Tags::default());
        mm.add_message_handler("a", "hit", Rc::new(|_: &str, _: &Value| Err(ScriptError::callback("bad"))));
        mm.add_message_handler("a", "hit", recorder(&log, "ok"));
        mm.send_message("a", "hit", &Value::Null);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_unregistered_object_gets_no_handler() {
        let mm = MessageManager::new();
        let log: Log = Rc::default();
        assert!(mm.add_message_handler("ghost", "x", recorder(&log, "g")).is_none());
        mm.send_message("ghost", "x", &Value::Null);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_remove_handler_and_remove_all() {
        let mm = MessageManager::new();
        let log: Log = Rc::default();
        mm.register_object("a", Tags::default());
        let h = mm.add_message_handler("a", "m", recorder(&log, "one")).unwrap();
        mm.add_message_handler("a", "m", recorder(&log, "two"));
        mm.remove_message_handler(h);
        mm.send_message("a", "m", &Value::Null);
        assert_eq!(*log.borrow(), vec!["two:m:null"]);
        mm.remove_all_handlers("a");
        mm.send_message("a", "m", &Value::Null);
        assert_eq!(log.borrow().len(), 1);
        assert!(mm.is_registered("a"));
    }

    #[test]
    fn test_broadcast_reaches_every_registered_object() {
        let mm = MessageManager::new();
        let log: Log = Rc::default();
        for id in ["a", "b"] {
            mm.register_object(id, Tags::default());
            mm.add_message_handler(id, "reset", recorder(&log, id));
        }
        mm.broadcast(None, "reset", &Value::Null);
        assert_eq!(*log.borrow(), vec!["a:reset:null", "b:reset:null"]);
    }

    #[test]
    fn test_recursive_sends_are_bounded() {
        let mm = Rc::new(MessageManager::with_max_depth(5));
        let count = Rc::new(Cell::new(0));
        mm.register_object("echo", Tags::default());
        let (m, c) = (mm.clone(), count.clone());
        mm.add_message_handler(
            "echo",
            "ping",
            Rc::new(move |t: &str, d: &Value| {
                c.set(c.get() + 1);
                m.send_message("echo", t, d);
                Ok(())
            }),
        );
        mm.send_message("echo", "ping", &Value::Null);
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mm = MessageManager::new();
        mm.register_object("a", tags(&["t"]));
        mm.clear();
        assert!(!mm.is_registered("a"));
        assert!(mm.objects_with_tag("t").is_empty());
    }
}
