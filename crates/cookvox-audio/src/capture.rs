//! Microphone capture on a dedicated thread.
//!
//! cpal streams are not `Send`, so the stream lives on its own OS thread and
//! the rest of the system talks to it through atomics and a frame channel.
//! The stream runs for the life of the thread; the gate decides whether the
//! callback forwards frames. The session layer opens the gate only while the
//! state machine is in `Listening`.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::PcmFrame;
use cookvox_foundation::AudioError;

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Input device name; `None` lets the host pick.
    pub device: Option<String>,
    /// Bound on in-flight frames before the callback starts dropping.
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            channel_capacity: 64,
        }
    }
}

pub struct CaptureThread {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    gate: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    sample_rate: u32,
}

impl CaptureThread {
    /// Spawn the capture thread and wait for the stream to come up.
    pub fn spawn(
        config: CaptureConfig,
        frame_tx: mpsc::Sender<PcmFrame>,
    ) -> Result<Self, AudioError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let gate = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));

        let (init_tx, init_rx) = crossbeam_channel::bounded::<Result<u32, AudioError>>(1);

        let thread_shutdown = Arc::clone(&shutdown);
        let thread_gate = Arc::clone(&gate);
        let thread_dropped = Arc::clone(&dropped);

        let handle = thread::Builder::new()
            .name("cookvox-capture".to_string())
            .spawn(move || {
                run_capture(
                    config,
                    frame_tx,
                    thread_shutdown,
                    thread_gate,
                    thread_dropped,
                    init_tx,
                );
            })
            .map_err(|e| AudioError::Fatal(format!("failed to spawn capture thread: {e}")))?;

        let sample_rate = init_rx
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| AudioError::Fatal("capture thread did not start in time".into()))??;

        tracing::info!(target: "audio", sample_rate, "capture thread started");
        Ok(Self {
            handle: Some(handle),
            shutdown,
            gate,
            dropped,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Open or close the capture gate. Closed means the callback discards
    /// everything and nothing reaches the channel.
    pub fn set_capturing(&self, on: bool) {
        self.gate.store(on, Ordering::SeqCst);
    }

    pub fn is_capturing(&self) -> bool {
        self.gate.load(Ordering::SeqCst)
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.gate.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_capture(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<PcmFrame>,
    shutdown: Arc<AtomicBool>,
    gate: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    init_tx: crossbeam_channel::Sender<Result<u32, AudioError>>,
) {
    let host = cpal::default_host();

    let device = match &config.device {
        Some(name) => host
            .input_devices()
            .ok()
            .and_then(|mut devices| {
                devices.find(|d| d.name().map(|n| &n == name).unwrap_or(false))
            })
            .ok_or_else(|| AudioError::DeviceNotFound {
                name: Some(name.clone()),
            }),
        None => host
            .default_input_device()
            .ok_or(AudioError::DeviceNotFound { name: None }),
    };
    let device = match device {
        Ok(d) => d,
        Err(e) => {
            let _ = init_tx.send(Err(e));
            return;
        }
    };

    let supported = match device.default_input_config() {
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
        tracing::error!(target: "audio", "capture stream error: {}", e);
    };

    let forward = {
        let gate = Arc::clone(&gate);
        let dropped = Arc::clone(&dropped);
        move |samples: Vec<i16>| {
            if !gate.load(Ordering::Relaxed) {
                return;
            }
            let frame = PcmFrame {
                samples: samples.into(),
                sample_rate,
                captured_at: Instant::now(),
            };
            if frame_tx.try_send(frame).is_err() {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    };

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            {
                let forward = forward.clone();
                move |data: &[i16], _| forward(downmix_i16(data, channels))
            },
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            {
                let forward = forward.clone();
                move |data: &[f32], _| forward(downmix_f32(data, channels))
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
    tracing::debug!(target: "audio", "capture thread stopped");
}

fn downmix_i16(data: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

fn downmix_f32(data: &[f32], channels: usize) -> Vec<i16> {
    let to_i16 = |s: f32| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
    if channels <= 1 {
        return data.iter().copied().map(to_i16).collect();
    }
    data.chunks(channels)
        .map(|frame| to_i16(frame.iter().sum::<f32>() / frame.len() as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        assert_eq!(downmix_i16(&[100, 200, 300, 500], 2), vec![150, 400]);
        assert_eq!(downmix_i16(&[1, 2, 3], 1), vec![1, 2, 3]);
    }

    #[test]
    fn downmix_f32_clamps_and_scales() {
        let out = downmix_f32(&[1.0, -1.0, 2.0], 1);
        assert_eq!(out[0], i16::MAX);
        assert_eq!(out[1], -i16::MAX);
        assert_eq!(out[2], i16::MAX);
    }
}
