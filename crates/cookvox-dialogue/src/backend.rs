use async_trait::async_trait;

use crate::auth::AuthToken;
use crate::session::DialogueSession;
use crate::setup::SessionSetup;
use cookvox_foundation::DialogueError;

/// One implementation per speech vendor. `connect` performs the handshake
/// and resolves once the backend is ready for audio, or with the handshake
/// failure. Timeouts are the caller's concern.
#[async_trait]
pub trait DialogueBackend: Send + Sync {
    async fn connect(
        &self,
        token: &AuthToken,
        setup: SessionSetup,
    ) -> Result<DialogueSession, DialogueError>;
}
