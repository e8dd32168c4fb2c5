//! Bridge between the engine and the audio thread.
//!
//! Use [`AudioBridge::spawn`] to start the default audio thread, or
//! [`AudioBridge::from_channels`] to plug in a host-provided one. Call
//! [`AudioBridge::shutdown`] during teardown to stop the thread.

use crate::events::audio::{AudioCmd, AudioMessage};
use crate::systems::audio::audio_thread;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::warn;

pub struct AudioBridge {
    /// Sender for [`AudioCmd`] messages (engine -> audio thread).
    pub tx_cmd: Sender<AudioCmd>,
    /// Receiver for [`AudioMessage`] messages (audio thread -> engine).
    pub rx_msg: Receiver<AudioMessage>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl AudioBridge {
    /// Spawn the default audio thread.
    pub fn spawn() -> Self {
        let (tx_cmd, rx_cmd) = unbounded::<AudioCmd>();
        let (tx_msg, rx_msg) = unbounded::<AudioMessage>();
        let handle = std::thread::spawn(move || audio_thread(rx_cmd, tx_msg));
        Self {
            tx_cmd,
            rx_msg,
            handle: Some(handle),
        }
    }

    /// Wrap channels owned by the host.
    pub fn from_channels(tx_cmd: Sender<AudioCmd>, rx_msg: Receiver<AudioMessage>) -> Self {
        Self {
            tx_cmd,
            rx_msg,
            handle: None,
        }
    }

    /// Queue a sound. Returns false when the audio thread is gone.
    pub fn play(&self, url: &str, volume: f32) -> bool {
        if self.tx_cmd.send(AudioCmd::play(url, volume)).is_err() {
            warn!("Audio thread is not running, dropping '{}'", url);
            return false;
        }
        true
    }

    /// Non-blocking drain of the audio thread's replies.
    pub fn drain_messages(&self) -> Vec<AudioMessage> {
        self.rx_msg.try_iter().collect()
    }

    /// Ask the audio thread to exit and join it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.tx_cmd.send(AudioCmd::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AudioBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_spawned_bridge_round_trip() {
        let bridge = AudioBridge::spawn();
        assert!(bridge.play("click.wav", 0.8));
        let reply = bridge.rx_msg.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(reply, AudioMessage::SoundStarted { url: "click.wav".into() });
        bridge.shutdown();
    }

    #[test]
    fn test_from_channels_forwards_commands() {
        let (tx_cmd, rx_cmd) = unbounded();
        let (_tx_msg, rx_msg) = unbounded();
        let bridge = AudioBridge::from_channels(tx_cmd, rx_msg);
        bridge.play("boom.ogg", 2.0);
        assert_eq!(
            rx_cmd.try_recv().unwrap(),
            AudioCmd::PlaySound { url: "boom.ogg".into(), volume: 1.0 }
        );
    }
}
