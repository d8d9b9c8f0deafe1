//! In-memory [`AudioSystem`] for tests and device-less demos.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::system::AudioSystem;
use crate::PcmFrame;

#[derive(Clone, Default)]
pub struct FakeAudioSystem {
    inner: Arc<FakeInner>,
}

#[derive(Default)]
struct FakeInner {
    not_ready: AtomicBool,
    capturing: AtomicBool,
    playing: AtomicBool,
    queued_samples: AtomicU64,
    clears: AtomicU64,
}

impl FakeAudioSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an audio subsystem that failed to initialize.
    pub fn set_ready(&self, ready: bool) {
        self.inner.not_ready.store(!ready, Ordering::SeqCst);
    }

    pub fn queued_samples(&self) -> u64 {
        self.inner.queued_samples.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> u64 {
        self.inner.clears.load(Ordering::SeqCst)
    }
}

impl AudioSystem for FakeAudioSystem {
    fn is_ready(&self) -> bool {
        !self.inner.not_ready.load(Ordering::SeqCst)
    }

    fn set_capturing(&self, on: bool) {
        self.inner.capturing.store(on, Ordering::SeqCst);
    }

    fn is_capturing(&self) -> bool {
        self.inner.capturing.load(Ordering::SeqCst)
    }

    fn set_playing(&self, on: bool) {
        self.inner.playing.store(on, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.inner.playing.load(Ordering::SeqCst)
    }

    fn enqueue_playback(&self, frame: &PcmFrame) {
        self.inner
            .queued_samples
            .fetch_add(frame.len() as u64, Ordering::SeqCst);
    }

    fn clear_playback(&self) {
        self.inner.queued_samples.store(0, Ordering::SeqCst);
        self.inner.clears.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gates_start_closed() {
        let fake = FakeAudioSystem::new();
        assert!(fake.is_ready());
        assert!(!fake.is_capturing());
        assert!(!fake.is_playing());
    }

    #[test]
    fn enqueue_and_clear_track_samples() {
        let fake = FakeAudioSystem::new();
        fake.enqueue_playback(&PcmFrame::from_samples(vec![0i16; 160], 16_000));
        assert_eq!(fake.queued_samples(), 160);

        fake.clear_playback();
        assert_eq!(fake.queued_samples(), 0);
        assert_eq!(fake.clear_count(), 1);
    }
}
