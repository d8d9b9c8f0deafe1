use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on each connect handshake.
    pub connect_timeout: Duration,
    /// Bound on the wait for a backend response after an utterance is sent.
    pub response_timeout: Duration,
    pub backoff: BackoffConfig,
    /// Capacity of the command/event channels between UI and runtime.
    pub channel_capacity: usize,
    /// Rate of outbound microphone frames, negotiated with the backend.
    pub input_sample_rate: u32,
    /// Rate synthesized frames come back at.
    pub output_sample_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            response_timeout: Duration::from_secs(20),
            backoff: BackoffConfig::default(),
            channel_capacity: 64,
            input_sample_rate: 16_000,
            output_sample_rate: 16_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the second attempt; the first is immediate.
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Random spread applied to each delay, as a fraction (0.1 = ±10%).
    pub jitter: f64,
    /// Total connect attempts before going offline.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: 0.1,
            max_attempts: 3,
        }
    }
}
