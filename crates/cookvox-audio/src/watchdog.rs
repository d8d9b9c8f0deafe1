//! Deadline tracker bounding how long the session waits on the backend.
//!
//! Passive by design: the session's select loop sleeps until [`deadline`]
//! rather than a polling thread. Armed while a response is outstanding, fed
//! on every inbound sign of life, disarmed when the turn completes.

use std::time::Duration;
use tokio::time::Instant;

pub struct ResponseWatchdog {
    timeout: Duration,
    armed_at: Option<Instant>,
}

impl ResponseWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            armed_at: None,
        }
    }

    /// Start (or restart) the response window.
    pub fn arm(&mut self) {
        self.armed_at = Some(Instant::now());
    }

    /// Inbound activity extends the window.
    pub fn feed(&mut self) {
        if self.armed_at.is_some() {
            self.armed_at = Some(Instant::now());
        }
    }

    pub fn disarm(&mut self) {
        self.armed_at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed_at.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Instant at which the wait has taken too long, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.armed_at.map(|t| t + self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn feed_extends_the_deadline() {
        let mut dog = ResponseWatchdog::new(Duration::from_secs(10));
        dog.arm();
        let first = dog.deadline().unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        dog.feed();
        let second = dog.deadline().unwrap();

        assert!(second > first);
        assert_eq!(second - first, Duration::from_secs(4));
    }

    #[tokio::test]
    async fn disarmed_watchdog_has_no_deadline() {
        let mut dog = ResponseWatchdog::new(Duration::from_secs(10));
        assert!(dog.deadline().is_none());

        dog.feed(); // feeding while disarmed stays disarmed
        assert!(!dog.is_armed());

        dog.arm();
        assert!(dog.is_armed());
        dog.disarm();
        assert!(dog.deadline().is_none());
    }
}
