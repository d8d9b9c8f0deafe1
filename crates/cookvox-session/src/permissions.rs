//! Microphone permission boundary.
//!
//! Checked before every `Listening` transition. Denial surfaces an
//! actionable explanation and disables voice activation; it is never
//! retried automatically and never crashes the session layer.

use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicPermission {
    Granted,
    Denied,
    /// The user has not been asked yet, or the platform could not say.
    Undetermined,
}

pub trait PermissionProbe: Send + Sync {
    fn microphone(&self) -> MicPermission;
}

/// Always-granted probe for demos and tests.
pub struct GrantedPermissions;

impl PermissionProbe for GrantedPermissions {
    fn microphone(&self) -> MicPermission {
        MicPermission::Granted
    }
}

/// Settable probe for tests simulating denial and later grants.
#[derive(Clone, Default)]
pub struct StaticPermissions {
    mic: Arc<RwLock<Option<MicPermission>>>,
}

impl StaticPermissions {
    pub fn new(mic: MicPermission) -> Self {
        Self {
            mic: Arc::new(RwLock::new(Some(mic))),
        }
    }

    pub fn set_microphone(&self, permission: MicPermission) {
        *self.mic.write() = Some(permission);
    }
}

impl PermissionProbe for StaticPermissions {
    fn microphone(&self) -> MicPermission {
        self.mic.read().unwrap_or(MicPermission::Granted)
    }
}
