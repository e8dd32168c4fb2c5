//! Play-mode orchestrator.
//!
//! [`GameEngine`] owns one instance of every manager (through a shared
//! [`PlayContext`]), the live object list and the compiled scripts of one play
//! session. The host drives it once per rendered frame:
//!
//! ```ignore
//! let mut engine = GameEngine::new(&config)?;
//! engine.load_scene(description);
//! engine.start();
//! loop {
//!     for event in host_events() {
//!         engine.handle_input(&event);
//!     }
//!     engine.tick(delta, elapsed);
//!     render(engine.objects(), engine.gui_snapshot());
//! }
//! ```
//!
//! # Frame order
//!
//! [`GameEngine::update`] refreshes input, ticks animations, ticks timers and
//! then calls the scene's `onUpdate` callback. [`GameEngine::run_object_scripts`]
//! then runs every object script in scene order against the already-updated
//! state. [`GameEngine::tick`] does both.
//!
//! A failing script is logged and never stops the frame.

use crate::error::RuntimeError;
use crate::events::audio::AudioMessage;
use crate::events::gui::GuiTrigger;
use crate::events::host::HostCmd;
use crate::events::input::{InputEvent, PointerEvent};
use crate::resources::animations::AnimationManager;
use crate::resources::audio::AudioBridge;
use crate::resources::gui::{GuiManager, GuiObserver, GuiSnapshot, SubscriptionId};
use crate::resources::lua_runtime::{
    ApiTables, GLOBAL_SCRIPT_PARAMS, OBJECT_SCRIPT_PARAMS, PlayContext, object_record,
    slot_message_handler,
};
use crate::resources::messages::{MessageManager, WILDCARD};
use crate::resources::runtimeconfig::RuntimeConfig;
use crate::resources::sceneworld::{FrameTime, SceneDescription, SceneObject};
use crate::resources::timers::TimerManager;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use mlua::prelude::*;
use std::rc::Rc;

/// Capability object for one script invocation.
pub struct ScriptApi {
    pub tables: ApiTables,
    /// The object record, or nil for the global script.
    pub object: LuaValue,
    /// The object's live mesh handle, or nil.
    pub mesh: LuaValue,
    pub time: f32,
    pub delta: f32,
}

impl ScriptApi {
    /// Arguments of an object script: `object, mesh, delta, time, engine, scene, input, gui`.
    pub fn object_args(&self) -> impl IntoLuaMulti {
        (
            self.object.clone(),
            self.mesh.clone(),
            self.delta,
            self.time,
            self.tables.engine.clone(),
            self.tables.scene.clone(),
            self.tables.input.clone(),
            self.tables.gui.clone(),
        )
    }

    /// Arguments of the global script: `engine, scene, input, gui, time, delta`.
    pub fn global_args(&self) -> impl IntoLuaMulti {
        (
            self.tables.engine.clone(),
            self.tables.scene.clone(),
            self.tables.input.clone(),
            self.tables.gui.clone(),
            self.time,
            self.delta,
        )
    }
}

struct ObjectScript {
    id: String,
    name: String,
    func: LuaFunction,
}

pub struct GameEngine {
    scripts: Vec<ObjectScript>,
    global_script: Option<LuaFunction>,
    started: bool,
    disposed: bool,
    ctx: Rc<PlayContext>,
}

impl GameEngine {
    /// Creates the managers and the sandboxed Lua runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Lua`] if the Lua state cannot be initialized.
    pub fn new(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let ctx = PlayContext::new(config)?;
        info!("Play engine created");
        Ok(Self {
            scripts: Vec::new(),
            global_script: None,
            started: false,
            disposed: false,
            ctx,
        })
    }

    pub fn context(&self) -> &Rc<PlayContext> {
        &self.ctx
    }

    pub fn timers(&self) -> &TimerManager {
        &self.ctx.timers
    }

    pub fn animations(&self) -> &AnimationManager {
        &self.ctx.animations
    }

    pub fn messages(&self) -> &MessageManager {
        &self.ctx.messages
    }

    pub fn gui(&self) -> &GuiManager {
        &self.ctx.gui
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Replace the objects and the global script in one go.
    pub fn load_scene(&mut self, scene: SceneDescription) {
        self.set_objects(scene.objects);
        self.set_global_script(scene.global_script.as_deref());
    }

    /// Replace the live object list.
    ///
    /// Previous objects are unregistered from messaging and their scripts
    /// dropped. Each new object gets its record, its message registration
    /// (tags plus the `onMessage` slot) and its compiled script.
    pub fn set_objects(&mut self, objects: Vec<SceneObject>) {
        let previous = self.ctx.world.borrow().ids().to_vec();
        for id in &previous {
            self.ctx.messages.unregister_object(id);
        }
        self.ctx.clear_records();
        self.scripts.clear();

        self.ctx.world.borrow_mut().set_objects(objects);
        let ids = self.ctx.world.borrow().ids().to_vec();
        for id in &ids {
            self.register_object(id);
        }
        info!("Scene has {} objects, {} with scripts", ids.len(), self.scripts.len());
    }

    /// Add one object to the running scene. Returns `false` if the id is taken.
    pub fn add_object(&mut self, object: SceneObject) -> bool {
        let id = object.id.clone();
        if !self.ctx.world.borrow_mut().spawn_object(object) {
            warn!("Object '{}' already exists", id);
            return false;
        }
        self.register_object(&id);
        true
    }

    /// Remove one object from the running scene.
    pub fn remove_object(&mut self, id: &str) -> bool {
        if !self.ctx.world.borrow_mut().despawn_object(id) {
            return false;
        }
        self.ctx.messages.unregister_object(id);
        self.ctx.remove_record(id);
        self.scripts.retain(|s| s.id != id);
        true
    }

    fn register_object(&mut self, id: &str) {
        let lua = self.ctx.lua();
        let weak = self.ctx.weak();
        let (record, tags, name, script) = {
            let world = self.ctx.world.borrow();
            let record = match object_record(lua, &weak, &world, &self.ctx.world, id) {
                Ok(record) => record,
                Err(err) => {
                    warn!("Object '{}' skipped: {}", id, err);
                    return;
                }
            };
            (
                record,
                world.tags(id).cloned().unwrap_or_default(),
                world.name(id).unwrap_or(id).to_string(),
                world.script(id).map(String::from),
            )
        };

        self.ctx.messages.register_object(id, tags);
        self.ctx
            .messages
            .add_message_handler(id, WILDCARD, slot_message_handler(&weak, record.clone()));
        self.ctx.set_record(id, record);

        let Some(source) = script else {
            return;
        };
        match self
            .ctx
            .runtime()
            .compile(&format!("object:{}", name), OBJECT_SCRIPT_PARAMS, &source)
        {
            Ok(func) => self.scripts.push(ObjectScript {
                id: id.to_string(),
                name,
                func,
            }),
            Err(err) => warn!("Script of '{}' does not compile: {}", name, err),
        }
    }

    /// Compile the scene-level script. `None` or blank removes it.
    pub fn set_global_script(&mut self, source: Option<&str>) {
        self.global_script = match source.filter(|s| !s.trim().is_empty()) {
            Some(src) => match self.ctx.runtime().compile("scene", GLOBAL_SCRIPT_PARAMS, src) {
                Ok(func) => Some(func),
                Err(err) => {
                    warn!("Global script does not compile: {}", err);
                    None
                }
            },
            None => None,
        };
    }

    /// Build the capability object for one invocation.
    ///
    /// `object` selects the `object` record and `mesh` handle; pass `None`
    /// for the global script. Unknown ids yield nil `object` and `mesh`.
    pub fn create_api(&self, object: Option<&str>, time: f32, delta: f32) -> LuaResult<ScriptApi> {
        let tables = self.ctx.api()?;
        let record = object.and_then(|id| self.ctx.record(id));
        let mesh = match &record {
            Some(r) => r.get::<LuaValue>("mesh")?,
            None => LuaValue::Nil,
        };
        Ok(ScriptApi {
            tables,
            object: record.map(LuaValue::Table).unwrap_or(LuaValue::Nil),
            mesh,
            time,
            delta,
        })
    }

    fn scene_callback(&self, name: &str) -> Option<LuaFunction> {
        let tables = self.ctx.api().ok()?;
        match tables.scene.get::<Option<LuaFunction>>(name) {
            Ok(func) => func,
            Err(err) => {
                warn!("scene.{} is not a function: {}", name, err);
                None
            }
        }
    }

    /// Run the global script once, then the `scene.onStart` callback.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        if let Some(func) = self.global_script.clone() {
            match self.create_api(None, 0.0, 0.0) {
                Ok(api) => {
                    if let Err(err) = self.ctx.invoke(&func, api.global_args()) {
                        warn!("Global script error: {}", err);
                    }
                }
                Err(err) => warn!("Global script skipped: {}", err),
            }
        }

        if let Some(on_start) = self.scene_callback("onStart")
            && let Err(err) = self.ctx.invoke(&on_start, ())
        {
            warn!("scene.onStart error: {}", err);
        }
        info!("Play started");
    }

    /// Feed one host input event. Edges show up on the next [`update`](Self::update).
    pub fn handle_input(&self, event: &InputEvent) {
        self.ctx.input.borrow_mut().handle_event(event);
    }

    /// Route a renderer interaction to the element's callback.
    pub fn handle_gui_trigger(&self, trigger: &GuiTrigger) {
        self.ctx.gui.trigger_element(&trigger.id, trigger.value.clone());
    }

    /// Call the object's `onClick`, `onHoverEnter` or `onHoverExit` slot.
    pub fn handle_pointer(&self, object_id: &str, event: PointerEvent) {
        let Some(record) = self.ctx.record(object_id) else {
            debug!("Pointer event for unknown object '{}'", object_id);
            return;
        };
        let slot = event.slot();
        match record.get::<Option<LuaFunction>>(slot) {
            Ok(Some(func)) => {
                if let Err(err) = self.ctx.invoke(&func, ()) {
                    warn!("{} error in '{}': {}", slot, object_id, err);
                }
            }
            Ok(None) => {}
            Err(err) => warn!("{} of '{}' is not a function: {}", slot, object_id, err),
        }
    }

    /// Advance input, animations and timers, then call `scene.onUpdate`.
    pub fn update(&mut self, delta: f32, time: f32) {
        self.ctx.input.borrow_mut().update();
        self.ctx.animations.update(delta);
        self.ctx.timers.update(delta);
        self.ctx.world.borrow_mut().set_frame_time(delta, time);

        if let Some(on_update) = self.scene_callback("onUpdate")
            && let Err(err) = self.ctx.invoke(&on_update, (delta, time))
        {
            warn!("scene.onUpdate error: {}", err);
        }
    }

    /// Run every object script once, in scene order.
    pub fn run_object_scripts(&self, delta: f32, time: f32) {
        for script in &self.scripts {
            if !self.ctx.world.borrow().contains(&script.id) {
                continue;
            }
            let api = match self.create_api(Some(&script.id), time, delta) {
                Ok(api) => api,
                Err(err) => {
                    warn!("Script of '{}' skipped: {}", script.name, err);
                    continue;
                }
            };
            if let Err(err) = self.ctx.invoke(&script.func, api.object_args()) {
                warn!("Script error in '{}': {}", script.name, err);
            }
        }
    }

    /// One full frame: [`update`](Self::update) then [`run_object_scripts`](Self::run_object_scripts).
    pub fn tick(&mut self, delta: f32, time: f32) {
        self.update(delta, time);
        self.run_object_scripts(delta, time);
    }

    /// Requests scripts made for the host since the last call.
    pub fn drain_host_commands(&self) -> Vec<HostCmd> {
        self.ctx.runtime().drain_host_commands()
    }

    /// Route `engine.playSound` to `bridge`. The audio thread keeps running
    /// for as long as any owner of the bridge holds it.
    pub fn attach_audio(&self, bridge: impl Into<Rc<AudioBridge>>) {
        self.ctx.attach_audio(bridge.into());
    }

    pub fn drain_audio_messages(&self) -> Vec<AudioMessage> {
        self.ctx.drain_audio_messages()
    }

    pub fn objects(&self) -> Vec<SceneObject> {
        self.ctx.world.borrow().objects()
    }

    pub fn object(&self, id: &str) -> Option<SceneObject> {
        self.ctx.world.borrow().object(id)
    }

    /// Delta, elapsed time and frame count of the last [`update`](Self::update).
    pub fn frame_time(&self) -> FrameTime {
        self.ctx.world.borrow().frame_time()
    }

    pub fn gui_snapshot(&self) -> GuiSnapshot {
        self.ctx.gui.snapshot()
    }

    pub fn subscribe_gui(&self, observer: impl Fn(&GuiSnapshot) + 'static) -> SubscriptionId {
        self.ctx.gui.subscribe(observer)
    }

    pub fn subscribe_gui_channel(&self) -> Receiver<GuiSnapshot> {
        self.ctx.gui.subscribe_channel()
    }

    pub fn subscribe_gui_shared(&self, observer: GuiObserver) -> SubscriptionId {
        self.ctx.gui.subscribe_shared(observer)
    }

    pub fn subscribe_gui_sender(&self, tx: Sender<GuiSnapshot>) {
        self.ctx.gui.subscribe_sender(tx);
    }

    /// Release timers, animations, handlers, GUI state and audio.
    ///
    /// Called automatically on drop. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.scripts.clear();
        self.global_script = None;
        self.ctx.dispose();
        info!("Play engine disposed");
    }
}

impl Drop for GameEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}
