//! Device-level interruption handling.
//!
//! Phone calls and backgrounding are first-class transitions, not errors:
//! capture is force-muted and the session parks at `Idle` with the
//! `Connection` left alive. When the interruption ends the connection is
//! ready again, but capture never auto-resumes: reopening the microphone
//! without a fresh press is a privacy hazard, so the user re-presses.
//! Transport-level failures take the reconnect path in the runtime instead.

use cookvox_foundation::VoiceSessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptionEvent {
    /// Incoming call, or another app claimed the audio session.
    AudioInterruptionBegan,
    AudioInterruptionEnded,
    AppBackgrounded,
    AppForegrounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Stop capture and playback, park the state machine at `Idle`, keep
    /// the connection.
    MuteAndPark,
    /// Connection is usable again; tell the user, require a re-press.
    AnnounceReady { was_listening: bool },
    None,
}

#[derive(Debug, Default)]
pub struct InterruptionController {
    active: bool,
    was_listening: bool,
}

impl InterruptionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_interrupted(&self) -> bool {
        self.active
    }

    pub fn on_event(
        &mut self,
        event: InterruptionEvent,
        state: VoiceSessionState,
    ) -> RecoveryAction {
        match event {
            InterruptionEvent::AudioInterruptionBegan | InterruptionEvent::AppBackgrounded => {
                if self.active {
                    return RecoveryAction::None;
                }
                self.active = true;
                self.was_listening = state == VoiceSessionState::Listening;
                tracing::info!(target: "session", ?event, ?state, "interruption began");
                RecoveryAction::MuteAndPark
            }
            InterruptionEvent::AudioInterruptionEnded | InterruptionEvent::AppForegrounded => {
                if !self.active {
                    return RecoveryAction::None;
                }
                self.active = false;
                let was_listening = self.was_listening;
                self.was_listening = false;
                tracing::info!(target: "session", ?event, was_listening, "interruption ended");
                RecoveryAction::AnnounceReady { was_listening }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VoiceSessionState::*;

    #[test]
    fn call_during_listening_mutes_then_requires_repress() {
        let mut ctl = InterruptionController::new();

        let action = ctl.on_event(InterruptionEvent::AudioInterruptionBegan, Listening);
        assert_eq!(action, RecoveryAction::MuteAndPark);
        assert!(ctl.is_interrupted());

        let action = ctl.on_event(InterruptionEvent::AudioInterruptionEnded, Idle);
        assert_eq!(
            action,
            RecoveryAction::AnnounceReady {
                was_listening: true
            }
        );
        assert!(!ctl.is_interrupted());
    }

    #[test]
    fn interruption_end_without_begin_is_ignored() {
        let mut ctl = InterruptionController::new();
        assert_eq!(
            ctl.on_event(InterruptionEvent::AudioInterruptionEnded, Idle),
            RecoveryAction::None
        );
    }

    #[test]
    fn nested_interruptions_collapse() {
        let mut ctl = InterruptionController::new();
        assert_eq!(
            ctl.on_event(InterruptionEvent::AudioInterruptionBegan, Speaking),
            RecoveryAction::MuteAndPark
        );
        // Backgrounding while already interrupted changes nothing.
        assert_eq!(
            ctl.on_event(InterruptionEvent::AppBackgrounded, Idle),
            RecoveryAction::None
        );
        assert_eq!(
            ctl.on_event(InterruptionEvent::AppForegrounded, Idle),
            RecoveryAction::AnnounceReady {
                was_listening: false
            }
        );
    }
}
