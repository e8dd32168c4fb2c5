//! Messages exchanged with the audio thread.

/// Commands sent *to* the audio thread.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCmd {
    /// Play a one-shot sound. `volume` is already clamped to [0, 1].
    PlaySound { url: String, volume: f32 },
    /// Stop everything that is currently playing.
    StopAll,
    Shutdown,
}

/// Messages sent *back* from the audio thread.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioMessage {
    SoundStarted { url: String },
    SoundFailed { url: String, error: String },
    Stopped,
}

impl AudioCmd {
    pub fn play(url: impl Into<String>, volume: f32) -> Self {
        AudioCmd::PlaySound {
            url: url.into(),
            volume: volume.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_clamps_volume() {
        assert_eq!(
            AudioCmd::play("beep.wav", 3.0),
            AudioCmd::PlaySound { url: "beep.wav".into(), volume: 1.0 }
        );
        assert_eq!(
            AudioCmd::play("beep.wav", -1.0),
            AudioCmd::PlaySound { url: "beep.wav".into(), volume: 0.0 }
        );
    }
}
