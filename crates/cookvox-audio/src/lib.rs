pub mod capture;
pub mod fake;
pub mod playback;
pub mod system;
pub mod watchdog;

pub use capture::{CaptureConfig, CaptureThread};
pub use fake::FakeAudioSystem;
pub use playback::PlaybackThread;
pub use system::{AudioSystem, CpalAudioSystem};
pub use watchdog::ResponseWatchdog;

use std::sync::Arc;
use std::time::Instant;

/// A chunk of raw PCM samples, mono i16.
#[derive(Debug, Clone)]
pub struct PcmFrame {
    pub samples: Arc<[i16]>,
    pub sample_rate: u32,
    pub captured_at: Instant,
}

impl PcmFrame {
    pub fn from_samples(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            captured_at: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
