//! sceneplay headless frame driver.
//!
//! Loads a scene description, enters play mode and drives a fixed number of
//! frames at a fixed delta, standing in for the editor's render loop. Useful
//! for trying behavior scripts without a viewport.
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --scene assets/scenes/demo.json --frames 300 \
//!     --press Space@30 --trigger gui-1@60 --print-gui
//! ```
//!
//! The final state of every object is printed to stdout as JSON. Logs,
//! including script `print` output under the `lua` target, go to stderr.

use clap::Parser;
use log::{debug, error, info};
use sceneplay::error::RuntimeError;
use sceneplay::events::gui::GuiTrigger;
use sceneplay::events::input::InputEvent;
use sceneplay::resources::audio::AudioBridge;
use sceneplay::resources::gui::GuiSnapshot;
use sceneplay::resources::input::normalize_key;
use sceneplay::resources::runtimeconfig::RuntimeConfig;
use sceneplay::resources::sceneworld::SceneDescription;
use sceneplay::session::PlayController;
use std::path::PathBuf;
use std::process::ExitCode;

/// Something that happens at a given frame, parsed from `VALUE@FRAME`.
#[derive(Debug, Clone)]
struct Scheduled {
    value: String,
    frame: u32,
}

fn parse_scheduled(s: &str) -> Result<Scheduled, String> {
    let (value, frame) = s
        .rsplit_once('@')
        .ok_or_else(|| format!("expected VALUE@FRAME, got '{}'", s))?;
    let frame = frame
        .parse::<u32>()
        .map_err(|e| format!("bad frame in '{}': {}", s, e))?;
    if value.is_empty() {
        return Err(format!("missing value in '{}'", s));
    }
    Ok(Scheduled {
        value: value.to_string(),
        frame,
    })
}

/// Run a scene's behavior scripts without a viewport.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Scene description (JSON with `objects` and optional `globalScript`).
    #[arg(long, short, value_name = "PATH")]
    scene: PathBuf,

    /// INI configuration file.
    #[arg(long, short, value_name = "PATH", default_value = "config.ini")]
    config: PathBuf,

    /// Frames to run (overrides `[play] frames`).
    #[arg(long)]
    frames: Option<u32>,

    /// Fixed frame rate (overrides `[play] target_fps`).
    #[arg(long)]
    fps: Option<u32>,

    /// Press a key on a frame and release it on the next one.
    #[arg(long = "press", value_name = "KEY@FRAME", value_parser = parse_scheduled)]
    presses: Vec<Scheduled>,

    /// Trigger a GUI element on a frame, as if the user clicked it.
    #[arg(long = "trigger", value_name = "ID@FRAME", value_parser = parse_scheduled)]
    triggers: Vec<Scheduled>,

    /// Print every GUI snapshot as it changes.
    #[arg(long)]
    print_gui: bool,
}

/// Key event a scheduled press produces on `frame`: down on its frame, up on
/// the following one.
fn press_event(press: &Scheduled, frame: u32) -> Option<InputEvent> {
    let code = normalize_key(&press.value);
    if press.frame == frame {
        Some(InputEvent::key_down(code))
    } else if press.frame.checked_add(1) == Some(frame) {
        Some(InputEvent::key_up(code))
    } else {
        None
    }
}

fn load_config(cli: &Cli) -> RuntimeConfig {
    let mut config = RuntimeConfig::with_path(&cli.config);
    if cli.config.exists() {
        if let Err(err) = config.load_from_file() {
            error!("{}", err);
        }
    } else {
        info!("No config at {}, using defaults", cli.config.display());
    }
    if let Some(frames) = cli.frames {
        config.frames = frames;
    }
    if let Some(fps) = cli.fps.filter(|fps| *fps > 0) {
        config.target_fps = fps;
    }
    config
}

fn run(cli: Cli) -> Result<(), RuntimeError> {
    let config = load_config(&cli);
    let text = std::fs::read_to_string(&cli.scene)?;
    let scene: SceneDescription = serde_json::from_str(&text)?;
    info!(
        "Loaded {} objects from {}",
        scene.objects.len(),
        cli.scene.display()
    );

    let frames = config.frames;
    let delta = config.frame_delta();
    let audio_enabled = config.audio_enabled;
    let mut play = PlayController::new(config);
    if audio_enabled {
        play.attach_audio(AudioBridge::spawn());
    }
    if cli.print_gui {
        play.subscribe_gui(|snapshot: &GuiSnapshot| match serde_json::to_string(snapshot) {
            Ok(json) => println!("gui: {}", json),
            Err(err) => error!("GUI snapshot not serializable: {}", err),
        });
    }
    play.start_play(scene)?;

    let mut elapsed = 0.0_f32;
    for frame in 0..frames {
        if let Some(engine) = play.engine() {
            for event in cli.presses.iter().filter_map(|p| press_event(p, frame)) {
                engine.handle_input(&event);
            }
            for trigger in cli.triggers.iter().filter(|t| t.frame == frame) {
                engine.handle_gui_trigger(&GuiTrigger::new(&trigger.value));
            }
        }

        elapsed += delta;
        for cmd in play.tick(delta, elapsed)? {
            match serde_json::to_string(&cmd) {
                Ok(json) => info!("host command: {}", json),
                Err(err) => error!("host command not serializable: {}", err),
            }
        }
        for msg in play.drain_audio_messages() {
            debug!("audio: {:?}", msg);
        }
    }

    if let Some(engine) = play.engine() {
        println!("{}", serde_json::to_string_pretty(&engine.objects())?);
        let ft = engine.frame_time();
        info!(
            "Ran {} frames, session at frame {} ({:.2}s of play, {} restarts)",
            frames,
            ft.frame,
            ft.elapsed,
            play.restart_count()
        );
    }
    play.stop_play()?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scheduled() {
        let s = parse_scheduled("Space@30").unwrap();
        assert_eq!(s.value, "Space");
        assert_eq!(s.frame, 30);
        let s = parse_scheduled("gui-1@0").unwrap();
        assert_eq!(s.value, "gui-1");
        assert!(parse_scheduled("Space").is_err());
        assert!(parse_scheduled("@3").is_err());
        assert!(parse_scheduled("a@x").is_err());
    }

    #[test]
    fn test_press_event_down_then_up() {
        let press = parse_scheduled("a@3").unwrap();
        assert_eq!(press_event(&press, 3), Some(InputEvent::key_down("KeyA")));
        assert_eq!(press_event(&press, 4), Some(InputEvent::key_up("KeyA")));
        assert_eq!(press_event(&press, 5), None);
        assert_eq!(press_event(&press, 2), None);
    }

    #[test]
    fn test_press_on_last_frame_does_not_overflow() {
        let press = parse_scheduled("Space@4294967295").unwrap();
        assert_eq!(press_event(&press, u32::MAX), Some(InputEvent::key_down("Space")));
        assert_eq!(press_event(&press, 0), None);
    }

    #[test]
    fn test_cli_parses_repeated_presses() {
        let cli = Cli::try_parse_from([
            "sceneplay", "--scene", "s.json", "--press", "a@1", "--press", "Space@2", "--fps", "30",
        ])
        .unwrap();
        assert_eq!(cli.presses.len(), 2);
        assert_eq!(cli.fps, Some(30));
        assert_eq!(cli.config, PathBuf::from("config.ini"));
    }
}
