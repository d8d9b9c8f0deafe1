//! Configurable mock backend for tests and the demo binary.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::auth::AuthToken;
use crate::backend::DialogueBackend;
use crate::session::{AdapterEndpoint, BackendEvent, DialogueSession, OutboundMessage};
use crate::setup::SessionSetup;
use cookvox_audio::PcmFrame;
use cookvox_foundation::DialogueError;
use cookvox_recipe::RecipeVoiceContext;

#[derive(Debug, Clone)]
pub struct MockBackendConfig {
    /// Fail this many connect attempts before letting one through.
    pub fail_first_connects: u32,
    /// Simulated handshake latency.
    pub connect_delay: Duration,
    /// Transcript emitted after each finished turn, when set.
    pub transcript: Option<String>,
    /// Synthesized audio frames per reply.
    pub reply_frames: usize,
    /// Samples per synthesized frame.
    pub reply_frame_samples: usize,
    /// Delay before the first reply event of a turn.
    pub reply_delay: Duration,
    /// Swallow finished turns without replying, to exercise timeouts.
    pub mute: bool,
    pub sample_rate: u32,
}

impl Default for MockBackendConfig {
    fn default() -> Self {
        Self {
            fail_first_connects: 0,
            connect_delay: Duration::ZERO,
            transcript: None,
            reply_frames: 2,
            reply_frame_samples: 160,
            reply_delay: Duration::ZERO,
            mute: false,
            sample_rate: 16_000,
        }
    }
}

enum MockControl {
    Emit(BackendEvent),
    DropConnection,
}

#[derive(Default)]
struct MockShared {
    connects_attempted: u32,
    contexts_seen: Vec<RecipeVoiceContext>,
    frames_received: u64,
    turns_finished: u64,
    control: Option<mpsc::Sender<MockControl>>,
}

/// Scripted stand-in for a speech vendor adapter.
pub struct MockDialogueBackend {
    config: MockBackendConfig,
    shared: Arc<Mutex<MockShared>>,
}

impl MockDialogueBackend {
    pub fn new(config: MockBackendConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Mutex::new(MockShared::default())),
        }
    }

    pub fn connects_attempted(&self) -> u32 {
        self.shared.lock().connects_attempted
    }

    /// Every context the backend has seen: one per handshake plus one per
    /// out-of-band update, in arrival order.
    pub fn contexts_seen(&self) -> Vec<RecipeVoiceContext> {
        self.shared.lock().contexts_seen.clone()
    }

    pub fn frames_received(&self) -> u64 {
        self.shared.lock().frames_received
    }

    pub fn turns_finished(&self) -> u64 {
        self.shared.lock().turns_finished
    }

    /// Push a backend error event into the live session.
    pub async fn inject_error(&self, message: impl Into<String>) {
        self.send_control(MockControl::Emit(BackendEvent::Error {
            message: message.into(),
        }))
        .await;
    }

    /// Kill the live session's event stream, simulating a dropped socket.
    pub async fn drop_connection(&self) {
        self.send_control(MockControl::DropConnection).await;
    }

    async fn send_control(&self, msg: MockControl) {
        let control = self.shared.lock().control.clone();
        if let Some(control) = control {
            let _ = control.send(msg).await;
        }
    }
}

#[async_trait]
impl DialogueBackend for MockDialogueBackend {
    async fn connect(
        &self,
        _token: &AuthToken,
        setup: SessionSetup,
    ) -> Result<DialogueSession, DialogueError> {
        let attempt = {
            let mut shared = self.shared.lock();
            shared.connects_attempted += 1;
            shared.connects_attempted
        };

        if self.config.connect_delay > Duration::ZERO {
            tokio::time::sleep(self.config.connect_delay).await;
        }

        if attempt <= self.config.fail_first_connects {
            tracing::debug!(target: "mock_backend", attempt, "simulated connect failure");
            return Err(DialogueError::Handshake(format!(
                "simulated handshake failure (attempt {attempt})"
            )));
        }

        let (session, endpoint) = DialogueSession::pair(64);
        let (control_tx, control_rx) = mpsc::channel(8);
        {
            let mut shared = self.shared.lock();
            shared.contexts_seen.push(setup.context.clone());
            shared.control = Some(control_tx);
        }

        tokio::spawn(run_mock_session(
            self.config.clone(),
            Arc::clone(&self.shared),
            endpoint,
            control_rx,
        ));

        Ok(session)
    }
}

async fn run_mock_session(
    config: MockBackendConfig,
    shared: Arc<Mutex<MockShared>>,
    mut endpoint: AdapterEndpoint,
    mut control: mpsc::Receiver<MockControl>,
) {
    loop {
        tokio::select! {
            msg = endpoint.outbound.recv() => match msg {
                Some(OutboundMessage::Audio(_)) => {
                    shared.lock().frames_received += 1;
                }
                Some(OutboundMessage::Context(ctx)) => {
                    shared.lock().contexts_seen.push(ctx);
                }
                Some(OutboundMessage::FinishTurn) => {
                    shared.lock().turns_finished += 1;
                    if !config.mute && !reply(&config, &endpoint.events).await {
                        break;
                    }
                }
                None => break, // client closed the session
            },
            ctl = control.recv() => match ctl {
                Some(MockControl::Emit(event)) => {
                    if endpoint.events.send(event).await.is_err() {
                        break;
                    }
                }
                Some(MockControl::DropConnection) | None => break,
            },
        }
    }
    tracing::debug!(target: "mock_backend", "mock session ended");
}

/// Emit one scripted reply; false when the client is gone.
async fn reply(config: &MockBackendConfig, events: &mpsc::Sender<BackendEvent>) -> bool {
    if config.reply_delay > Duration::ZERO {
        tokio::time::sleep(config.reply_delay).await;
    }

    if let Some(text) = &config.transcript {
        let sent = events
            .send(BackendEvent::Transcript {
                text: text.clone(),
                confidence: 0.92,
            })
            .await;
        if sent.is_err() {
            return false;
        }
    }

    for _ in 0..config.reply_frames {
        let frame = PcmFrame::from_samples(
            vec![0i16; config.reply_frame_samples],
            config.sample_rate,
        );
        if events.send(BackendEvent::Audio(frame)).await.is_err() {
            return false;
        }
    }

    events.send(BackendEvent::TurnComplete).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cookvox_recipe::{build_voice_context, Ingredient, Recipe};

    fn context() -> RecipeVoiceContext {
        let recipe = Recipe {
            id: "r-1".into(),
            title: "Toast".into(),
            ingredients: vec![Ingredient::new("bread", 2.0, "slices")],
            instructions: vec!["Toast the bread.".into()],
            base_servings: Some(1),
        };
        build_voice_context(&recipe, 0, 1.0)
    }

    #[tokio::test]
    async fn failed_connects_are_counted_then_succeed() {
        let backend = MockDialogueBackend::new(MockBackendConfig {
            fail_first_connects: 2,
            ..Default::default()
        });
        let token = AuthToken::new("t");

        for _ in 0..2 {
            let err = backend
                .connect(&token, SessionSetup::new(context()))
                .await
                .unwrap_err();
            assert!(matches!(err, DialogueError::Handshake(_)));
        }
        assert!(backend
            .connect(&token, SessionSetup::new(context()))
            .await
            .is_ok());
        assert_eq!(backend.connects_attempted(), 3);
    }

    #[tokio::test]
    async fn finished_turn_replies_with_transcript_audio_and_completion() {
        let backend = MockDialogueBackend::new(MockBackendConfig {
            transcript: Some("next step".into()),
            reply_frames: 2,
            ..Default::default()
        });
        let mut session = backend
            .connect(&AuthToken::new("t"), SessionSetup::new(context()))
            .await
            .unwrap();

        session
            .send_audio(PcmFrame::from_samples(vec![0; 160], 16_000))
            .await
            .unwrap();
        session.finish_turn().await.unwrap();

        assert!(matches!(
            session.next_event().await,
            Some(BackendEvent::Transcript { .. })
        ));
        assert!(matches!(
            session.next_event().await,
            Some(BackendEvent::Audio(_))
        ));
        assert!(matches!(
            session.next_event().await,
            Some(BackendEvent::Audio(_))
        ));
        assert!(matches!(
            session.next_event().await,
            Some(BackendEvent::TurnComplete)
        ));
        assert_eq!(backend.frames_received(), 1);
        assert_eq!(backend.turns_finished(), 1);
    }

    #[tokio::test]
    async fn context_updates_are_recorded_in_order() {
        let backend = MockDialogueBackend::new(MockBackendConfig::default());
        let session = backend
            .connect(&AuthToken::new("t"), SessionSetup::new(context()))
            .await
            .unwrap();

        let mut updated = context();
        updated.current_step = 0;
        updated.scale = 2.0;
        session.update_context(updated.clone()).await.unwrap();

        // Let the adapter task drain the channel.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let seen = backend.contexts_seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], updated);
    }

    #[tokio::test]
    async fn dropped_connection_ends_the_event_stream() {
        let backend = MockDialogueBackend::new(MockBackendConfig::default());
        let mut session = backend
            .connect(&AuthToken::new("t"), SessionSetup::new(context()))
            .await
            .unwrap();

        backend.drop_connection().await;
        assert!(session.next_event().await.is_none());
    }
}
