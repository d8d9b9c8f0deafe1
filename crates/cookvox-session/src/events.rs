//! Commands into the runtime and events back out to the UI layer.

use cookvox_foundation::VoiceSessionState;
use cookvox_recipe::RecipeVoiceContext;

use crate::interruption::InterruptionEvent;

/// Everything the UI (or the platform glue) can ask of the session. Each
/// command is a message to the runtime's single entry point; nothing mutates
/// session state from a callback.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Push-to-talk pressed, or a wake word fired upstream.
    PressTalk,
    /// Push-to-talk released.
    ReleaseTalk,
    /// Step or scale changed; rebuild happened screen-side.
    UpdateContext(RecipeVoiceContext),
    /// Locally recognized or typed utterance, e.g. while offline.
    LocalUtterance(String),
    Interruption(InterruptionEvent),
    /// Dismissed the error banner.
    Reset,
    /// Leaving cook mode: unconditional teardown.
    Shutdown,
}

/// Non-blocking UI surface: a lightweight indicator reflects these; there
/// are no modal dialogs for transient reconnects.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged {
        from: VoiceSessionState,
        to: VoiceSessionState,
    },
    /// Persistent offline indicator, raised only after bounded retries are
    /// exhausted.
    OfflineChanged { offline: bool },
    PermissionDenied { reason: String },
    /// A timer/navigation/scaling command ran through the local handlers.
    CommandDispatched {
        kind: &'static str,
        raw_text: String,
    },
    /// A free-form question needs the assistant, which is unreachable.
    QueryUnavailable { question: String },
    TurnCompleted,
    Notice { message: String },
}
