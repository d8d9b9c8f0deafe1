use std::time::Duration;
use thiserror::Error;

use crate::state::VoiceSessionState;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Audio subsystem error: {0}")]
    Audio(#[from] AudioError),

    #[error("Dialogue backend error: {0}")]
    Dialogue(#[from] DialogueError),

    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: VoiceSessionState,
        to: VoiceSessionState,
    },

    #[error("Assistant took too long: no response within {0:?}")]
    ResponseTimeout(Duration),

    #[error("Reconnect attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Input device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("Device disconnected")]
    DeviceDisconnected,

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("No inbound audio for {duration:?}")]
    NoDataTimeout { duration: Duration },

    #[error("CPAL error: {0}")]
    Cpal(#[from] cpal::StreamError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Pause stream error: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("Supported stream configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("Default stream config error: {0}")]
    DefaultStreamConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

/// Errors crossing the dialogue backend boundary. Vendor adapters map their
/// SDK failures into these; raw vendor errors never travel further up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialogueError {
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Auth token rejected: {0}")]
    AuthRejected(String),

    #[error("Token issuance failed: {0}")]
    TokenUnavailable(String),

    #[error("Connection dropped: {0}")]
    Disconnected(String),

    #[error("Backend reported error: {0}")]
    Backend(String),

    #[error("Session already closed")]
    SessionClosed,
}

/// How the session layer should react to a given failure.
#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    /// Reconnect with exponential backoff, up to a bounded attempt count.
    Reconnect { max_attempts: u32, delay: Duration },
    /// Stay offline; keep serving navigation/timer commands locally.
    LocalFallback,
    /// Recoverable only through explicit user action (reset, system settings).
    ManualReset,
    /// Log and carry on.
    Ignore,
}

impl SessionError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            SessionError::Dialogue(_) | SessionError::ResponseTimeout(_) => {
                RecoveryStrategy::Reconnect {
                    max_attempts: 3,
                    delay: Duration::from_millis(500),
                }
            }
            SessionError::ReconnectExhausted { .. } => RecoveryStrategy::LocalFallback,
            SessionError::InvalidTransition { .. } => RecoveryStrategy::Ignore,
            SessionError::PermissionDenied(_) | SessionError::Fatal(_) => {
                RecoveryStrategy::ManualReset
            }
            SessionError::Audio(_) => RecoveryStrategy::ManualReset,
        }
    }

    /// True for failures that must never trigger an automatic retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.recovery_strategy(),
            RecoveryStrategy::ManualReset | RecoveryStrategy::LocalFallback
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_never_retried() {
        let err = SessionError::PermissionDenied("user declined".into());
        assert!(err.is_terminal());
        assert!(matches!(
            err.recovery_strategy(),
            RecoveryStrategy::ManualReset
        ));
    }

    #[test]
    fn transport_failures_reconnect() {
        let err = SessionError::Dialogue(DialogueError::Disconnected("socket reset".into()));
        assert!(matches!(
            err.recovery_strategy(),
            RecoveryStrategy::Reconnect { .. }
        ));

        let err = SessionError::ResponseTimeout(Duration::from_secs(20));
        assert!(matches!(
            err.recovery_strategy(),
            RecoveryStrategy::Reconnect { .. }
        ));
    }

    #[test]
    fn exhausted_reconnects_fall_back_locally() {
        let err = SessionError::ReconnectExhausted { attempts: 3 };
        assert!(matches!(
            err.recovery_strategy(),
            RecoveryStrategy::LocalFallback
        ));
    }
}
