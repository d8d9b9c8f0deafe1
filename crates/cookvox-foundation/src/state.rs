use crate::error::SessionError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The session is in exactly one of these states at any instant.
///
/// Capture runs only in `Listening`; playback runs only in `Speaking`.
/// The transition table in [`SessionStateManager::transition`] is the sole
/// mechanism keeping those two mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceSessionState {
    /// Connected, neither capturing nor playing. Initial state.
    Idle,
    /// Capturing microphone audio and streaming it to the backend.
    Listening,
    /// Utterance sent, waiting for the backend to respond.
    Processing,
    /// Playing the backend's synthesized reply.
    Speaking,
    /// Unrecoverable until an explicit reset.
    Error,
}

/// A committed state change, as delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: VoiceSessionState,
    pub to: VoiceSessionState,
}

struct StateInner {
    state: VoiceSessionState,
    last_error: Option<String>,
    changed_at: Instant,
}

/// Owns the current [`VoiceSessionState`] and validates every transition
/// against the fixed table. Rejected transitions leave the state untouched
/// and are reported to the caller; callers must not assume a request succeeds.
pub struct SessionStateManager {
    inner: Arc<RwLock<StateInner>>,
    change_tx: Sender<StateChange>,
    change_rx: Receiver<StateChange>,
}

impl Default for SessionStateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateManager {
    pub fn new() -> Self {
        let (change_tx, change_rx) = crossbeam_channel::unbounded();
        Self {
            inner: Arc::new(RwLock::new(StateInner {
                state: VoiceSessionState::Idle,
                last_error: None,
                changed_at: Instant::now(),
            })),
            change_tx,
            change_rx,
        }
    }

    /// Request a transition to `to`. Anything not in the table is rejected
    /// as a no-op and returned as [`SessionError::InvalidTransition`].
    pub fn transition(&self, to: VoiceSessionState) -> Result<StateChange, SessionError> {
        use VoiceSessionState::*;

        let mut inner = self.inner.write();
        let from = inner.state;

        let valid = matches!(
            (from, to),
            (Idle, Listening)
                | (Idle, Error)
                | (Listening, Processing)
                | (Listening, Idle)
                | (Listening, Error)
                | (Processing, Speaking)
                | (Processing, Idle)
                | (Processing, Error)
                | (Speaking, Idle)
                | (Speaking, Listening)
                | (Speaking, Error)
                | (Error, Idle)
        );

        if !valid {
            return Err(SessionError::InvalidTransition { from, to });
        }

        tracing::debug!(target: "session", ?from, ?to, "state transition");
        inner.state = to;
        inner.changed_at = Instant::now();
        if to != Error {
            inner.last_error = None;
        }
        let change = StateChange { from, to };
        let _ = self.change_tx.send(change);
        Ok(change)
    }

    /// Move to `Error`, recording the message for the UI. Safe to call from
    /// any state; calling while already in `Error` only updates the message.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        {
            let mut inner = self.inner.write();
            if inner.state == VoiceSessionState::Error {
                inner.last_error = Some(message);
                return;
            }
        }
        if self.transition(VoiceSessionState::Error).is_ok() {
            self.inner.write().last_error = Some(message);
        }
    }

    /// Explicit reset: `Error` yields `Idle`; any other state is a no-op
    /// returning the state unchanged.
    pub fn reset(&self) -> VoiceSessionState {
        let current = self.current();
        if current == VoiceSessionState::Error {
            let _ = self.transition(VoiceSessionState::Idle);
            return VoiceSessionState::Idle;
        }
        current
    }

    pub fn current(&self) -> VoiceSessionState {
        self.inner.read().state
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }

    /// Time spent in the current state, for staleness checks.
    pub fn elapsed_in_state(&self) -> Duration {
        self.inner.read().changed_at.elapsed()
    }

    pub fn subscribe(&self) -> Receiver<StateChange> {
        self.change_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VoiceSessionState::*;

    const ALL: [VoiceSessionState; 5] = [Idle, Listening, Processing, Speaking, Error];

    fn manager_in(state: VoiceSessionState) -> SessionStateManager {
        let mgr = SessionStateManager::new();
        match state {
            Idle => {}
            Listening => {
                mgr.transition(Listening).unwrap();
            }
            Processing => {
                mgr.transition(Listening).unwrap();
                mgr.transition(Processing).unwrap();
            }
            Speaking => {
                mgr.transition(Listening).unwrap();
                mgr.transition(Processing).unwrap();
                mgr.transition(Speaking).unwrap();
            }
            Error => {
                mgr.fail("boom");
            }
        }
        assert_eq!(mgr.current(), state);
        mgr
    }

    fn allowed(from: VoiceSessionState, to: VoiceSessionState) -> bool {
        matches!(
            (from, to),
            (Idle, Listening)
                | (Idle, Error)
                | (Listening, Processing)
                | (Listening, Idle)
                | (Listening, Error)
                | (Processing, Speaking)
                | (Processing, Idle)
                | (Processing, Error)
                | (Speaking, Idle)
                | (Speaking, Listening)
                | (Speaking, Error)
                | (Error, Idle)
        )
    }

    #[test]
    fn transition_table_is_exhaustive_and_deterministic() {
        for from in ALL {
            for to in ALL {
                let mgr = manager_in(from);
                let result = mgr.transition(to);
                if allowed(from, to) {
                    let change = result.unwrap();
                    assert_eq!(change, StateChange { from, to });
                    assert_eq!(mgr.current(), to);
                } else {
                    assert!(result.is_err(), "{:?} -> {:?} should be rejected", from, to);
                    // Rejected requests are no-ops.
                    assert_eq!(mgr.current(), from);
                }
            }
        }
    }

    #[test]
    fn reset_from_error_yields_idle() {
        let mgr = manager_in(Error);
        assert_eq!(mgr.reset(), Idle);
        assert_eq!(mgr.current(), Idle);
    }

    #[test]
    fn reset_is_noop_outside_error() {
        for state in [Idle, Listening, Processing, Speaking] {
            let mgr = manager_in(state);
            assert_eq!(mgr.reset(), state);
            assert_eq!(mgr.current(), state);
        }
    }

    #[test]
    fn fail_records_message_and_reset_clears_it() {
        let mgr = manager_in(Speaking);
        mgr.fail("socket dropped");
        assert_eq!(mgr.current(), Error);
        assert_eq!(mgr.last_error().as_deref(), Some("socket dropped"));

        mgr.reset();
        assert_eq!(mgr.last_error(), None);
    }

    #[test]
    fn fail_in_error_updates_message_only() {
        let mgr = manager_in(Error);
        mgr.fail("second failure");
        assert_eq!(mgr.current(), Error);
        assert_eq!(mgr.last_error().as_deref(), Some("second failure"));
    }

    #[test]
    fn elapsed_in_state_restarts_on_transition() {
        let mgr = SessionStateManager::new();
        std::thread::sleep(Duration::from_millis(20));
        assert!(mgr.elapsed_in_state() >= Duration::from_millis(20));

        mgr.transition(Listening).unwrap();
        assert!(mgr.elapsed_in_state() < Duration::from_millis(20));
    }

    #[test]
    fn subscribers_observe_committed_changes_in_order() {
        let mgr = SessionStateManager::new();
        let rx = mgr.subscribe();

        mgr.transition(Listening).unwrap();
        mgr.transition(Processing).unwrap();
        // Rejected request must not be published.
        assert!(mgr.transition(Listening).is_err());
        mgr.transition(Speaking).unwrap();

        let seen: Vec<_> = rx.try_iter().map(|c| c.to).collect();
        assert_eq!(seen, vec![Listening, Processing, Speaking]);
    }
}
