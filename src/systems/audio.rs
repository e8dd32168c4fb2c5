//! Default audio thread.
//!
//! The runtime does not ship an audio device. [`audio_thread`] is a sink that
//! validates and logs every request and answers with an
//! [`AudioMessage`], so hosts without sound still see the requests and hosts
//! with sound can replace it through
//! [`AudioBridge::from_channels`](crate::resources::audio::AudioBridge::from_channels).

use crate::events::audio::{AudioCmd, AudioMessage};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info};

/// Run until [`AudioCmd::Shutdown`] arrives or the command channel closes.
pub fn audio_thread(rx_cmd: Receiver<AudioCmd>, tx_msg: Sender<AudioMessage>) {
    let mut playing: u32 = 0;
    while let Ok(cmd) = rx_cmd.recv() {
        match cmd {
            AudioCmd::PlaySound { url, volume } => {
                if url.trim().is_empty() {
                    let _ = tx_msg.send(AudioMessage::SoundFailed {
                        url,
                        error: "empty sound url".into(),
                    });
                    continue;
                }
                info!(target: "audio", "play '{}' at volume {:.2}", url, volume);
                playing += 1;
                let _ = tx_msg.send(AudioMessage::SoundStarted { url });
            }
            AudioCmd::StopAll => {
                debug!(target: "audio", "stop all ({} started)", playing);
                playing = 0;
                let _ = tx_msg.send(AudioMessage::Stopped);
            }
            AudioCmd::Shutdown => break,
        }
    }
    debug!(target: "audio", "audio thread exiting");
}
