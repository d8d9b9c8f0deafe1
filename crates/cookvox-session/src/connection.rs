//! One logical session to the dialogue backend.
//!
//! Exactly one `Connection` exists per cook-mode screen. It owns the
//! transport handle, the last-sent recipe context (resent automatically on
//! reconnect), and the reconnect bookkeeping.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use cookvox_dialogue::{
    BackendEvent, DialogueBackend, DialogueSession, SessionSetup, TokenProvider,
};
use cookvox_foundation::{DialogueError, SessionError};
use cookvox_recipe::RecipeVoiceContext;

use crate::backoff::ExponentialBackoff;
use crate::config::SessionConfig;

pub struct Connection {
    backend: Arc<dyn DialogueBackend>,
    tokens: Arc<dyn TokenProvider>,
    session: Option<DialogueSession>,
    context: RecipeVoiceContext,
    input_sample_rate: u32,
    output_sample_rate: u32,
    backoff: ExponentialBackoff,
}

impl Connection {
    pub fn new(
        backend: Arc<dyn DialogueBackend>,
        tokens: Arc<dyn TokenProvider>,
        context: RecipeVoiceContext,
        config: &SessionConfig,
    ) -> Self {
        Self {
            backend,
            tokens,
            session: None,
            context,
            input_sample_rate: config.input_sample_rate,
            output_sample_rate: config.output_sample_rate,
            backoff: ExponentialBackoff::new(config.backoff.clone()),
        }
    }

    pub fn is_established(&self) -> bool {
        self.session.is_some()
    }

    pub fn context(&self) -> &RecipeVoiceContext {
        &self.context
    }

    /// Remember the latest context so a reconnect carries it without the
    /// user repeating anything.
    pub fn set_context(&mut self, context: RecipeVoiceContext) {
        self.context = context;
    }

    /// Fetch a token and perform the handshake, bounded by
    /// `connect_timeout`. The handshake ships the remembered context.
    pub async fn establish(&mut self, connect_timeout: Duration) -> Result<(), SessionError> {
        let token = self.tokens.token().await?;
        let setup = SessionSetup::new(self.context.clone())
            .with_sample_rates(self.input_sample_rate, self.output_sample_rate);

        match tokio::time::timeout(connect_timeout, self.backend.connect(&token, setup)).await {
            Ok(Ok(session)) => {
                self.session = Some(session);
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(SessionError::ResponseTimeout(connect_timeout)),
        }
    }

    pub async fn send_audio(&self, frame: cookvox_audio::PcmFrame) -> Result<(), DialogueError> {
        match &self.session {
            Some(session) => session.send_audio(frame).await,
            None => Err(DialogueError::SessionClosed),
        }
    }

    pub async fn update_context(
        &mut self,
        context: RecipeVoiceContext,
    ) -> Result<(), DialogueError> {
        self.context = context.clone();
        match &self.session {
            Some(session) => session.update_context(context).await,
            // Not connected: keep it for the next handshake.
            None => Ok(()),
        }
    }

    pub async fn finish_turn(&self) -> Result<(), DialogueError> {
        match &self.session {
            Some(session) => session.finish_turn().await,
            None => Err(DialogueError::SessionClosed),
        }
    }

    /// Next backend event. Pends forever while no session is established so
    /// this can sit in a `select!` unguarded; `None` after establishment
    /// means the transport dropped.
    pub async fn next_event(&mut self) -> Option<BackendEvent> {
        match self.session.as_mut() {
            Some(session) => session.next_event().await,
            None => pending().await,
        }
    }

    /// Drop the transport handle. The adapter sees the close and ends the
    /// vendor session.
    pub fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
    }

    pub fn next_backoff(&mut self) -> Option<Duration> {
        self.backoff.next_delay()
    }

    pub fn attempts(&self) -> u32 {
        self.backoff.attempts()
    }

    pub fn reset_backoff(&mut self) {
        self.backoff.reset();
    }
}
