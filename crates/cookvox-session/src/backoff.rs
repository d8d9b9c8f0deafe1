//! Exponential backoff with jitter for connect attempts.

use rand::Rng;
use std::time::Duration;

use crate::config::BackoffConfig;

pub struct ExponentialBackoff {
    config: BackoffConfig,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Delay to wait before the next attempt. The first call is `ZERO` (try
    /// immediately); afterwards the delay grows by `multiplier` up to
    /// `max_delay`. `None` once `max_attempts` attempts have been handed out.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.config.max_attempts {
            return None;
        }
        let delay = if self.attempt == 0 {
            Duration::ZERO
        } else {
            let exp = self.config.multiplier.powi(self.attempt as i32 - 1);
            let base = self.config.initial_delay.mul_f64(exp);
            self.jittered(base.min(self.config.max_delay))
        };
        self.attempt += 1;
        Some(delay)
    }

    /// Attempts handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.config.max_attempts
    }

    /// Call after a successful connect so the next failure starts fresh.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    fn jittered(&self, base: Duration) -> Duration {
        if self.config.jitter <= 0.0 {
            return base;
        }
        let spread = self.config.jitter.min(1.0);
        let factor = rand::thread_rng().gen_range(1.0 - spread..=1.0 + spread);
        base.mul_f64(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_without_jitter(max_attempts: u32) -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: 0.0,
            max_attempts,
        }
    }

    #[test]
    fn delays_double_from_initial_after_immediate_first_attempt() {
        let mut backoff = ExponentialBackoff::new(config_without_jitter(4));
        assert_eq!(backoff.next_delay(), Some(Duration::ZERO));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(500)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1000)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(2000)));
        assert_eq!(backoff.next_delay(), None);
        assert!(backoff.is_exhausted());
    }

    #[test]
    fn delays_are_clamped_to_max() {
        let mut backoff = ExponentialBackoff::new(BackoffConfig {
            max_delay: Duration::from_secs(1),
            max_attempts: 10,
            ..config_without_jitter(10)
        });
        let mut last = Duration::ZERO;
        for _ in 0..10 {
            last = backoff.next_delay().unwrap();
        }
        assert_eq!(last, Duration::from_secs(1));
    }

    #[test]
    fn reset_starts_the_sequence_over() {
        let mut backoff = ExponentialBackoff::new(config_without_jitter(2));
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), None);

        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::ZERO));
    }

    #[test]
    fn jitter_stays_within_the_spread() {
        let mut backoff = ExponentialBackoff::new(BackoffConfig {
            jitter: 0.1,
            max_attempts: 100,
            ..config_without_jitter(100)
        });
        backoff.next_delay(); // skip the immediate attempt
        for _ in 0..20 {
            let d = backoff.next_delay().unwrap();
            let max = Duration::from_secs(8).mul_f64(1.1);
            assert!(d >= Duration::from_millis(450), "delay {d:?} below spread");
            assert!(d <= max, "delay {d:?} above spread");
        }
    }
}
