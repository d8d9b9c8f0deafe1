//! Capture/playback as one capability the session layer consumes.

use tokio::sync::mpsc;

use crate::capture::{CaptureConfig, CaptureThread};
use crate::playback::PlaybackThread;
use crate::PcmFrame;
use cookvox_foundation::AudioError;

/// What the session runtime needs from the audio subsystem. The state
/// machine's entry actions call these; it never touches cpal directly.
pub trait AudioSystem: Send {
    /// Whether the subsystem came up (devices opened, threads running).
    /// Push-to-talk is refused while this is false.
    fn is_ready(&self) -> bool;

    fn set_capturing(&self, on: bool);
    fn is_capturing(&self) -> bool;

    fn set_playing(&self, on: bool);
    fn is_playing(&self) -> bool;

    /// Queue an inbound synthesized frame for playback.
    fn enqueue_playback(&self, frame: &PcmFrame);
    /// Drop any queued playback (interruption path).
    fn clear_playback(&self);
}

/// Real devices: one capture thread, one playback thread.
pub struct CpalAudioSystem {
    capture: CaptureThread,
    playback: PlaybackThread,
}

impl CpalAudioSystem {
    /// Open the default (or named) devices and return the system plus the
    /// stream of captured frames.
    pub fn open(
        config: CaptureConfig,
        output_device: Option<String>,
    ) -> Result<(Self, mpsc::Receiver<PcmFrame>), AudioError> {
        let (frame_tx, frame_rx) = mpsc::channel(config.channel_capacity);
        let capture = CaptureThread::spawn(config, frame_tx)?;
        let playback = PlaybackThread::spawn(output_device)?;
        Ok((Self { capture, playback }, frame_rx))
    }

    pub fn capture_sample_rate(&self) -> u32 {
        self.capture.sample_rate()
    }

    pub fn playback_sample_rate(&self) -> u32 {
        self.playback.sample_rate()
    }
}

impl AudioSystem for CpalAudioSystem {
    fn is_ready(&self) -> bool {
        true
    }

    fn set_capturing(&self, on: bool) {
        self.capture.set_capturing(on);
    }

    fn is_capturing(&self) -> bool {
        self.capture.is_capturing()
    }

    fn set_playing(&self, on: bool) {
        self.playback.set_playing(on);
    }

    fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    fn enqueue_playback(&self, frame: &PcmFrame) {
        self.playback.enqueue(frame);
    }

    fn clear_playback(&self) {
        self.playback.clear();
    }
}
