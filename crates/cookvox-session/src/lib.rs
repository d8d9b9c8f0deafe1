//! The voice session runtime: one cook-mode screen, one [`Connection`], one
//! event loop driving the state machine.

pub mod backoff;
pub mod config;
pub mod connection;
pub mod events;
pub mod fallback;
pub mod interruption;
pub mod permissions;
pub mod runtime;

pub use backoff::ExponentialBackoff;
pub use config::{BackoffConfig, SessionConfig};
pub use connection::Connection;
pub use events::{SessionCommand, SessionEvent};
pub use fallback::{dispatch_local, CookModeActions, RecordingActions};
pub use interruption::{InterruptionController, InterruptionEvent, RecoveryAction};
pub use permissions::{GrantedPermissions, MicPermission, PermissionProbe, StaticPermissions};
pub use runtime::{SessionDeps, VoiceSessionHandle, VoiceSessionRuntime};
