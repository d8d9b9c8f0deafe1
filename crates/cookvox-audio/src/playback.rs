//! Speaker playback on a dedicated thread.
//!
//! Mirrors the capture side: the output stream lives on its own thread and
//! pulls from a shared sample queue. With the gate closed (or the queue dry)
//! the callback emits silence, so "playback active" is exactly "gate open".

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::PcmFrame;
use cookvox_foundation::AudioError;

pub struct PlaybackThread {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    gate: Arc<AtomicBool>,
    queue: Arc<Mutex<VecDeque<i16>>>,
    sample_rate: u32,
}

impl PlaybackThread {
    pub fn spawn(device: Option<String>) -> Result<Self, AudioError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let gate = Arc::new(AtomicBool::new(false));
        let queue: Arc<Mutex<VecDeque<i16>>> = Arc::new(Mutex::new(VecDeque::new()));

        let (init_tx, init_rx) = crossbeam_channel::bounded::<Result<u32, AudioError>>(1);

        let thread_shutdown = Arc::clone(&shutdown);
        let thread_gate = Arc::clone(&gate);
        let thread_queue = Arc::clone(&queue);

        let handle = thread::Builder::new()
            .name("cookvox-playback".to_string())
            .spawn(move || {
                run_playback(device, thread_shutdown, thread_gate, thread_queue, init_tx);
            })
            .map_err(|e| AudioError::Fatal(format!("failed to spawn playback thread: {e}")))?;

        let sample_rate = init_rx
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| AudioError::Fatal("playback thread did not start in time".into()))??;

        tracing::info!(target: "audio", sample_rate, "playback thread started");
        Ok(Self {
            handle: Some(handle),
            shutdown,
            gate,
            queue,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_playing(&self, on: bool) {
        self.gate.store(on, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.gate.load(Ordering::SeqCst)
    }

    /// Append a frame to the playback queue. Callers are expected to deliver
    /// frames at the negotiated output rate.
    pub fn enqueue(&self, frame: &PcmFrame) {
        self.queue.lock().extend(frame.samples.iter().copied());
    }

    /// Drop whatever is still queued (interruption path).
    pub fn clear(&self) {
        self.queue.lock().clear();
    }

    pub fn queued_samples(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.gate.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PlaybackThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_playback(
    device: Option<String>,
    shutdown: Arc<AtomicBool>,
    gate: Arc<AtomicBool>,
    queue: Arc<Mutex<VecDeque<i16>>>,
    init_tx: crossbeam_channel::Sender<Result<u32, AudioError>>,
) {
    let host = cpal::default_host();

    let device = match &device {
        Some(name) => host
            .output_devices()
            .ok()
            .and_then(|mut devices| {
                devices.find(|d| d.name().map(|n| &n == name).unwrap_or(false))
            })
            .ok_or_else(|| AudioError::DeviceNotFound {
                name: Some(name.clone()),
            }),
        None => host
            .default_output_device()
            .ok_or(AudioError::DeviceNotFound { name: None }),
    };
    let device = match device {
        Ok(d) => d,
        Err(e) => {
            let _ = init_tx.send(Err(e));
            return;
        }
    };

    let supported = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = init_tx.send(Err(e.into()));
            return;
        }
    };
    let sample_format = supported.sample_format();
    let stream_config = supported.config();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels as usize;

    let err_fn = |e: cpal::StreamError| {
        tracing::error!(target: "audio", "playback stream error: {}", e);
    };

    let next_sample = {
        let gate = Arc::clone(&gate);
        let queue = Arc::clone(&queue);
        move || -> i16 {
            if !gate.load(Ordering::Relaxed) {
                return 0;
            }
            queue.lock().pop_front().unwrap_or(0)
        }
    };

    let stream = match sample_format {
        SampleFormat::I16 => device.build_output_stream(
            &stream_config,
            {
                let next_sample = next_sample.clone();
                move |data: &mut [i16], _| {
                    for frame in data.chunks_mut(channels) {
                        let s = next_sample();
                        frame.fill(s);
                    }
                }
            },
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_output_stream(
            &stream_config,
            {
                let next_sample = next_sample.clone();
                move |data: &mut [f32], _| {
                    for frame in data.chunks_mut(channels) {
                        let s = next_sample() as f32 / i16::MAX as f32;
                        frame.fill(s);
                    }
                }
            },
            err_fn,
            None,
        ),
        other => {
            let _ = init_tx.send(Err(AudioError::FormatNotSupported {
                format: format!("{other:?}"),
            }));
            return;
        }
    };

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = init_tx.send(Err(e.into()));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = init_tx.send(Err(e.into()));
        return;
    }
    let _ = init_tx.send(Ok(sample_rate));

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }
    drop(stream);
    tracing::debug!(target: "audio", "playback thread stopped");
}
