use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared counters for cross-task session monitoring.
///
/// Cloning is cheap; all clones observe the same counters.
#[derive(Clone, Default)]
pub struct SessionMetrics {
    // Audio flow
    pub frames_sent: Arc<AtomicU64>,     // outbound mic frames delivered to backend
    pub frames_received: Arc<AtomicU64>, // inbound synthesized frames
    pub frames_dropped: Arc<AtomicU64>,  // capture frames dropped outside Listening

    // Turn lifecycle
    pub turns_completed: Arc<AtomicU64>,
    pub utterances_cancelled: Arc<AtomicU64>, // push-to-talk released with no audio
    pub last_turn_time: Arc<RwLock<Option<Instant>>>,

    // State machine
    pub transitions: Arc<AtomicU64>,
    pub rejected_transitions: Arc<AtomicU64>,

    // Failure handling
    pub reconnect_attempts: Arc<AtomicU64>,
    pub reconnects_succeeded: Arc<AtomicU64>,
    pub response_timeouts: Arc<AtomicU64>,
    pub transport_errors: Arc<AtomicU64>,
    pub interruptions: Arc<AtomicU64>,
    pub is_offline: Arc<AtomicBool>,

    // Command parsing
    pub local_commands: Arc<AtomicU64>, // timer/navigation/scaling handled on-device
    pub query_fallbacks: Arc<AtomicU64>, // utterances forwarded as free-form queries
}

impl SessionMetrics {
    pub fn mark_turn_completed(&self) {
        self.turns_completed.fetch_add(1, Ordering::Relaxed);
        *self.last_turn_time.write() = Some(Instant::now());
    }

    pub fn set_offline(&self, offline: bool) {
        self.is_offline.store(offline, Ordering::Relaxed);
    }

    pub fn offline(&self) -> bool {
        self.is_offline.load(Ordering::Relaxed)
    }

    /// One-line summary for periodic stats logging.
    pub fn summary(&self) -> String {
        format!(
            "frames out/in: {}/{} | turns: {} | reconnects: {}/{} | timeouts: {} | local cmds: {} | offline: {}",
            self.frames_sent.load(Ordering::Relaxed),
            self.frames_received.load(Ordering::Relaxed),
            self.turns_completed.load(Ordering::Relaxed),
            self.reconnects_succeeded.load(Ordering::Relaxed),
            self.reconnect_attempts.load(Ordering::Relaxed),
            self.response_timeouts.load(Ordering::Relaxed),
            self.local_commands.load(Ordering::Relaxed),
            self.offline(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = SessionMetrics::default();
        let clone = metrics.clone();

        metrics.frames_sent.fetch_add(3, Ordering::Relaxed);
        clone.frames_sent.fetch_add(2, Ordering::Relaxed);

        assert_eq!(metrics.frames_sent.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn turn_completion_stamps_time() {
        let metrics = SessionMetrics::default();
        assert!(metrics.last_turn_time.read().is_none());

        metrics.mark_turn_completed();
        assert_eq!(metrics.turns_completed.load(Ordering::Relaxed), 1);
        assert!(metrics.last_turn_time.read().is_some());
    }
}
