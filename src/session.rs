//! Play-mode state machine.
//!
//! A [`PlayController`] is either idle or playing. Entering play creates a
//! fresh [`GameEngine`] from the editor's scene description; leaving play
//! disposes it, discarding every timer, animation, handler and GUI element
//! the scripts created. Scene edits made during play are lost, the saved
//! description is what the next play session starts from.
//!
//! Host-side hooks (GUI observers, GUI channels and the audio bridge) belong
//! to the controller and are attached to every engine it creates, so they
//! survive `stop_play`/`start_play` cycles and `scene.restart()`.

use crate::engine::GameEngine;
use crate::error::RuntimeError;
use crate::events::audio::AudioMessage;
use crate::events::host::HostCmd;
use crate::resources::audio::AudioBridge;
use crate::resources::gui::{GuiObserver, GuiSnapshot};
use crate::resources::runtimeconfig::RuntimeConfig;
use crate::resources::sceneworld::SceneDescription;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::info;
use std::rc::Rc;

#[derive(Default)]
struct HostHooks {
    gui_observers: Vec<GuiObserver>,
    gui_channels: Vec<Sender<GuiSnapshot>>,
    audio: Option<Rc<AudioBridge>>,
}

impl HostHooks {
    fn attach(&self, engine: &GameEngine) {
        for observer in &self.gui_observers {
            engine.subscribe_gui_shared(observer.clone());
        }
        for tx in &self.gui_channels {
            engine.subscribe_gui_sender(tx.clone());
        }
        if let Some(bridge) = &self.audio {
            engine.attach_audio(bridge.clone());
        }
    }
}

pub struct PlayController {
    config: RuntimeConfig,
    scene: Option<SceneDescription>,
    engine: Option<GameEngine>,
    hooks: HostHooks,
    restarts: u32,
}

impl PlayController {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            scene: None,
            engine: None,
            hooks: HostHooks::default(),
            restarts: 0,
        }
    }

    /// Receive every GUI snapshot of this and all later sessions.
    ///
    /// Observers registered before [`start_play`](Self::start_play) also see
    /// the controls built by the global script on start.
    pub fn subscribe_gui(&mut self, observer: impl Fn(&GuiSnapshot) + 'static) {
        let observer: GuiObserver = Rc::new(observer);
        if let Some(engine) = &self.engine {
            engine.subscribe_gui_shared(observer.clone());
        }
        self.hooks.gui_observers.push(observer);
    }

    /// Channel flavor of [`subscribe_gui`](Self::subscribe_gui).
    pub fn subscribe_gui_channel(&mut self) -> Receiver<GuiSnapshot> {
        let (tx, rx) = unbounded();
        if let Some(engine) = &self.engine {
            engine.subscribe_gui_sender(tx.clone());
        }
        self.hooks.gui_channels.push(tx);
        rx
    }

    /// Route sound requests of this and all later sessions to `bridge`.
    pub fn attach_audio(&mut self, bridge: AudioBridge) {
        let bridge = Rc::new(bridge);
        if let Some(engine) = &self.engine {
            engine.attach_audio(bridge.clone());
        }
        self.hooks.audio = Some(bridge);
    }

    pub fn drain_audio_messages(&self) -> Vec<AudioMessage> {
        self.hooks
            .audio
            .as_ref()
            .map(|bridge| bridge.drain_messages())
            .unwrap_or_default()
    }

    /// Number of times a script restarted the scene since the controller
    /// was created.
    pub fn restart_count(&self) -> u32 {
        self.restarts
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&GameEngine> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut GameEngine> {
        self.engine.as_mut()
    }

    /// Enter play mode with `scene`.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::AlreadyPlaying`] if a session is active, or the
    /// engine construction error.
    pub fn start_play(&mut self, scene: SceneDescription) -> Result<&mut GameEngine, RuntimeError> {
        if self.engine.is_some() {
            return Err(RuntimeError::AlreadyPlaying);
        }
        let mut engine = GameEngine::new(&self.config)?;
        self.hooks.attach(&engine);
        engine.load_scene(scene.clone());
        engine.start();
        self.scene = Some(scene);
        info!("Entered play mode");
        Ok(self.engine.insert(engine))
    }

    /// Leave play mode and dispose the engine.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotPlaying`] if no session is active.
    pub fn stop_play(&mut self) -> Result<(), RuntimeError> {
        let mut engine = self.engine.take().ok_or(RuntimeError::NotPlaying)?;
        engine.dispose();
        info!("Left play mode");
        Ok(())
    }

    /// Restart from the scene the current session started with.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotPlaying`] if no session is active.
    pub fn restart(&mut self) -> Result<&mut GameEngine, RuntimeError> {
        self.stop_play()?;
        let scene = self.scene.take().unwrap_or_default();
        self.start_play(scene)
    }

    /// Advance one frame and return the host commands scripts queued.
    ///
    /// A `scene.restart()` request is handled here and not returned; the new
    /// session keeps the host hooks and bumps
    /// [`restart_count`](Self::restart_count).
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotPlaying`] if no session is active.
    pub fn tick(&mut self, delta: f32, time: f32) -> Result<Vec<HostCmd>, RuntimeError> {
        let engine = self.engine.as_mut().ok_or(RuntimeError::NotPlaying)?;
        engine.tick(delta, time);
        let (restart, commands): (Vec<HostCmd>, Vec<HostCmd>) = engine
            .drain_host_commands()
            .into_iter()
            .partition(|cmd| *cmd == HostCmd::Restart);
        if !restart.is_empty() {
            self.restart()?;
            self.restarts += 1;
            info!("Scene restarted by script");
        }
        Ok(commands)
    }
}
