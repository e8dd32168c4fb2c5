//! Runtime configuration.
//!
//! Settings for a play session, loaded from an INI file. Every key is
//! optional; missing values keep their defaults.
//!
//! # Configuration File Format
//!
//! ```ini
//! [play]
//! target_fps = 60
//! frames = 600
//!
//! [timers]
//! interval_catch_up = single
//!
//! [messages]
//! max_dispatch_depth = 32
//!
//! [audio]
//! enabled = true
//!
//! [gui]
//! default_slider_step = 0.1
//! ```

use crate::resources::gui::DEFAULT_SLIDER_STEP;
use crate::resources::messages::DEFAULT_MAX_DEPTH;
use crate::resources::timers::IntervalCatchUp;
use configparser::ini::Ini;
use log::{info, warn};
use std::path::PathBuf;

const DEFAULT_TARGET_FPS: u32 = 60;
const DEFAULT_FRAMES: u32 = 600;
const DEFAULT_AUDIO_ENABLED: bool = true;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Frame rate used by the headless driver to derive the frame delta.
    pub target_fps: u32,
    /// Frames simulated by the headless driver.
    pub frames: u32,
    pub interval_catch_up: IntervalCatchUp,
    /// Maximum nesting of message sends from inside handlers.
    pub max_dispatch_depth: u32,
    pub audio_enabled: bool,
    pub default_slider_step: f64,
    pub config_path: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            frames: DEFAULT_FRAMES,
            interval_catch_up: IntervalCatchUp::default(),
            max_dispatch_depth: DEFAULT_MAX_DEPTH,
            audio_enabled: DEFAULT_AUDIO_ENABLED,
            default_slider_step: DEFAULT_SLIDER_STEP,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Frame delta in seconds for the configured frame rate.
    pub fn frame_delta(&self) -> f32 {
        1.0 / self.target_fps.max(1) as f32
    }

    /// Load configuration from the INI file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    /// Load configuration from INI text.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        // [play] section
        if let Some(fps) = config.getuint("play", "target_fps").ok().flatten() {
            if fps == 0 {
                warn!("Ignoring target_fps = 0");
            } else {
                self.target_fps = fps as u32;
            }
        }
        if let Some(frames) = config.getuint("play", "frames").ok().flatten() {
            self.frames = frames as u32;
        }

        // [timers] section
        if let Some(mode) = config.get("timers", "interval_catch_up") {
            match IntervalCatchUp::parse(&mode) {
                Some(mode) => self.interval_catch_up = mode,
                None => warn!("Unknown interval_catch_up '{}', keeping {:?}", mode, self.interval_catch_up),
            }
        }

        // [messages] section
        if let Some(depth) = config.getuint("messages", "max_dispatch_depth").ok().flatten() {
            self.max_dispatch_depth = (depth as u32).max(1);
        }

        // [audio] section
        if let Some(enabled) = config.getbool("audio", "enabled").ok().flatten() {
            self.audio_enabled = enabled;
        }

        // [gui] section
        if let Some(step) = config.getfloat("gui", "default_slider_step").ok().flatten() {
            if step > 0.0 {
                self.default_slider_step = step;
            }
        }

        info!(
            "Loaded config: fps={}, frames={}, catch_up={:?}, max_depth={}, audio={}, slider_step={}",
            self.target_fps,
            self.frames,
            self.interval_catch_up,
            self.max_dispatch_depth,
            self.audio_enabled,
            self.default_slider_step
        );
    }

    /// Save configuration to the INI file.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        config.set("play", "target_fps", Some(self.target_fps.to_string()));
        config.set("play", "frames", Some(self.frames.to_string()));
        let catch_up = match self.interval_catch_up {
            IntervalCatchUp::Single => "single",
            IntervalCatchUp::All => "all",
        };
        config.set("timers", "interval_catch_up", Some(catch_up.to_string()));
        config.set("messages", "max_dispatch_depth", Some(self.max_dispatch_depth.to_string()));
        config.set("audio", "enabled", Some(self.audio_enabled.to_string()));
        config.set("gui", "default_slider_step", Some(self.default_slider_step.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::new();
        assert_eq!(config.target_fps, 60);
        assert_eq!(config.interval_catch_up, IntervalCatchUp::Single);
        assert_eq!(config.max_dispatch_depth, 32);
        assert!(config.audio_enabled);
    }

    #[test]
    fn test_load_from_str_overrides_present_keys() {
        let mut config = RuntimeConfig::new();
        config
            .load_from_str("[timers]\ninterval_catch_up = all\n[audio]\nenabled = false\n")
            .unwrap();
        assert_eq!(config.interval_catch_up, IntervalCatchUp::All);
        assert!(!config.audio_enabled);
        assert_eq!(config.frames, 600);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let mut config = RuntimeConfig::new();
        config
            .load_from_str("[play]\ntarget_fps = 0\n[timers]\ninterval_catch_up = sometimes\n")
            .unwrap();
        assert_eq!(config.target_fps, 60);
        assert_eq!(config.interval_catch_up, IntervalCatchUp::Single);
    }

    #[test]
    fn test_frame_delta() {
        let mut config = RuntimeConfig::new();
        config.target_fps = 50;
        assert!((config.frame_delta() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_is_error() {
        let mut config = RuntimeConfig::with_path("/nonexistent/sceneplay.ini");
        assert!(config.load_from_file().is_err());
    }
}
