//! Shared state behind the capability tables.
//!
//! A [`PlayContext`] owns the managers of one play session together with the
//! Lua runtime. Every Lua function exposed to scripts captures a `Weak`
//! reference to it, so the context is freed as soon as the engine drops it
//! even while Lua still holds those functions.
//!
//! # Script invocations
//!
//! [`PlayContext::invoke`] runs a Lua function inside a fresh coroutine. When
//! the function calls `engine.wait(ms)` the coroutine yields, a one-shot
//! timer of `ms` is scheduled and the coroutine is resumed from the timer
//! tick of whichever frame crosses the delay. The frame loop never blocks.

use super::api::{self, ApiTables};
use super::runtime::{LuaRuntime, WAIT_MARKER};
use crate::error::ScriptError;
use crate::events::audio::{AudioCmd, AudioMessage};
use crate::resources::animations::AnimationManager;
use crate::resources::audio::AudioBridge;
use crate::resources::gui::GuiManager;
use crate::resources::input::InputManager;
use crate::resources::messages::MessageManager;
use crate::resources::runtimeconfig::RuntimeConfig;
use crate::resources::sceneworld::SceneWorld;
use crate::resources::timers::TimerManager;
use log::warn;
use mlua::prelude::*;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub struct PlayContext {
    pub input: RefCell<InputManager>,
    pub timers: TimerManager,
    pub animations: AnimationManager,
    pub messages: MessageManager,
    pub gui: GuiManager,
    pub world: Rc<RefCell<SceneWorld>>,
    audio: RefCell<Option<Rc<AudioBridge>>>,
    audio_enabled: bool,
    /// Script-visible `object` record of every live object, by id.
    records: RefCell<FxHashMap<String, LuaTable>>,
    api: RefCell<Option<ApiTables>>,
    me: Weak<PlayContext>,
    // Dropped last, after every manager holding Lua values
    runtime: LuaRuntime,
}

impl PlayContext {
    /// Creates the managers, the Lua runtime and the shared capability tables.
    ///
    /// # Errors
    ///
    /// Returns an error if Lua initialization or API registration fails.
    pub fn new(config: &RuntimeConfig) -> LuaResult<Rc<Self>> {
        let runtime = LuaRuntime::new()?;
        let ctx = Rc::new_cyclic(|me| Self {
            input: RefCell::new(InputManager::new()),
            timers: TimerManager::with_catch_up(config.interval_catch_up),
            animations: AnimationManager::new(),
            messages: MessageManager::with_max_depth(config.max_dispatch_depth),
            gui: GuiManager::with_default_step(config.default_slider_step),
            world: Rc::new(RefCell::new(SceneWorld::new())),
            audio: RefCell::new(None),
            audio_enabled: config.audio_enabled,
            records: RefCell::new(FxHashMap::default()),
            api: RefCell::new(None),
            me: me.clone(),
            runtime,
        });
        let tables = api::build_api(ctx.lua(), &ctx.me, ctx.runtime.wait_function())?;
        *ctx.api.borrow_mut() = Some(tables);
        Ok(ctx)
    }

    pub fn lua(&self) -> &Lua {
        self.runtime.lua()
    }

    pub fn runtime(&self) -> &LuaRuntime {
        &self.runtime
    }

    pub fn weak(&self) -> Weak<PlayContext> {
        self.me.clone()
    }

    /// The shared `engine`, `scene`, `input` and `gui` tables.
    pub fn api(&self) -> LuaResult<ApiTables> {
        self.api
            .borrow()
            .clone()
            .ok_or_else(|| LuaError::runtime("play session has been disposed"))
    }

    pub fn record(&self, id: &str) -> Option<LuaTable> {
        self.records.borrow().get(id).cloned()
    }

    pub fn set_record(&self, id: &str, record: LuaTable) {
        self.records.borrow_mut().insert(id.to_string(), record);
    }

    pub fn remove_record(&self, id: &str) {
        self.records.borrow_mut().remove(id);
    }

    pub fn clear_records(&self) {
        self.records.borrow_mut().clear();
    }

    /// Run `func` with `args` as a resumable script invocation.
    pub fn invoke(&self, func: &LuaFunction, args: impl IntoLuaMulti) -> Result<(), ScriptError> {
        let thread = self.lua().create_thread(func.clone())?;
        self.resume(thread, args)
    }

    fn resume(&self, thread: LuaThread, args: impl IntoLuaMulti) -> Result<(), ScriptError> {
        let yielded: LuaMultiValue = thread.resume(args)?;
        if thread.status() != LuaThreadStatus::Resumable {
            return Ok(());
        }

        let ms = wait_request(&yielded);
        let me = self.me.clone();
        self.timers.wait(ms).on_resolved(move || match me.upgrade() {
            Some(ctx) => ctx.resume(thread, ()),
            None => Ok(()),
        });
        Ok(())
    }

    pub fn attach_audio(&self, bridge: Rc<AudioBridge>) {
        *self.audio.borrow_mut() = Some(bridge);
    }

    pub fn detach_audio(&self) -> Option<Rc<AudioBridge>> {
        self.audio.borrow_mut().take()
    }

    /// Status messages sent back by the audio thread.
    pub fn drain_audio_messages(&self) -> Vec<AudioMessage> {
        self.audio
            .borrow()
            .as_deref()
            .map(AudioBridge::drain_messages)
            .unwrap_or_default()
    }

    /// Forward a sound request to the audio thread.
    pub fn play_sound(&self, url: &str, volume: f32) {
        if !self.audio_enabled {
            warn!("Audio unavailable (disabled in config): '{}' not played", url);
            return;
        }
        match self.audio.borrow().as_ref() {
            Some(bridge) => {
                if bridge.tx_cmd.send(AudioCmd::play(url, volume)).is_err() {
                    warn!("Audio unavailable (audio thread stopped): '{}' not played", url);
                }
            }
            None => warn!("Audio unavailable (not initialized): '{}' not played", url),
        }
    }

    /// Release everything the session holds.
    pub fn dispose(&self) {
        self.timers.dispose();
        self.animations.stop_all_animations();
        self.messages.clear();
        self.gui.reset();
        self.clear_records();
        self.api.borrow_mut().take();
        // The audio thread stops once the last owner of the bridge drops it
        self.detach_audio();
    }
}

/// Milliseconds requested by a yield from `engine.wait`.
fn wait_request(yielded: &LuaMultiValue) -> f32 {
    let mut values = yielded.iter();
    match (values.next(), values.next()) {
        (Some(LuaValue::String(marker)), Some(ms)) if &*marker.as_bytes() == WAIT_MARKER.as_bytes() => {
            match ms {
                LuaValue::Integer(i) => *i as f32,
                LuaValue::Number(n) => *n as f32,
                _ => 0.0,
            }
        }
        _ => {
            warn!("Script yielded outside engine.wait; resuming next frame");
            0.0
        }
    }
}
