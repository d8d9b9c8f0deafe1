//! Message-passing handle to one live backend session.
//!
//! Vendor SDKs tend to surface events through subscription callbacks; those
//! map onto one inbound channel here, so every event reaches the state
//! machine through a single entry point instead of mutating state from a
//! callback.

use tokio::sync::mpsc;

use cookvox_audio::PcmFrame;
use cookvox_foundation::DialogueError;
use cookvox_recipe::RecipeVoiceContext;

/// Events flowing in from the backend.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// A chunk of synthesized speech. The first one of a turn marks
    /// "response audio begins".
    Audio(PcmFrame),
    /// Finalized recognition of the user's utterance, when the backend
    /// provides one.
    Transcript { text: String, confidence: f32 },
    /// The assistant finished its reply.
    TurnComplete,
    /// Backend-reported failure. The session treats this as a transport
    /// error.
    Error { message: String },
}

/// Messages flowing out to the backend.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    /// Microphone audio, delivered in capture order.
    Audio(PcmFrame),
    /// Out-of-band context update; takes effect for the next turn.
    Context(RecipeVoiceContext),
    /// The user released push-to-talk: the utterance is complete.
    FinishTurn,
}

/// Client half of a live session. Dropping it closes the outbound channel,
/// which is the adapter's signal to end the vendor session.
#[derive(Debug)]
pub struct DialogueSession {
    outbound: mpsc::Sender<OutboundMessage>,
    events: mpsc::Receiver<BackendEvent>,
}

/// Adapter half: what a vendor adapter consumes and feeds.
pub struct AdapterEndpoint {
    pub outbound: mpsc::Receiver<OutboundMessage>,
    pub events: mpsc::Sender<BackendEvent>,
}

impl DialogueSession {
    /// Create a connected (client, adapter) pair.
    pub fn pair(capacity: usize) -> (Self, AdapterEndpoint) {
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        (
            Self {
                outbound: outbound_tx,
                events: event_rx,
            },
            AdapterEndpoint {
                outbound: outbound_rx,
                events: event_tx,
            },
        )
    }

    pub async fn send_audio(&self, frame: PcmFrame) -> Result<(), DialogueError> {
        self.send(OutboundMessage::Audio(frame)).await
    }

    pub async fn update_context(&self, context: RecipeVoiceContext) -> Result<(), DialogueError> {
        self.send(OutboundMessage::Context(context)).await
    }

    pub async fn finish_turn(&self) -> Result<(), DialogueError> {
        self.send(OutboundMessage::FinishTurn).await
    }

    /// Next inbound event; `None` means the adapter dropped its end and the
    /// transport is gone.
    pub async fn next_event(&mut self) -> Option<BackendEvent> {
        self.events.recv().await
    }

    pub fn close(self) {
        // Dropping the sender is the close signal.
    }

    async fn send(&self, msg: OutboundMessage) -> Result<(), DialogueError> {
        self.outbound
            .send(msg)
            .await
            .map_err(|_| DialogueError::SessionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn messages_cross_the_pair_in_order() {
        let (session, mut adapter) = DialogueSession::pair(8);

        session
            .send_audio(PcmFrame::from_samples(vec![1, 2, 3], 16_000))
            .await
            .unwrap();
        session.finish_turn().await.unwrap();

        assert!(matches!(
            adapter.outbound.recv().await,
            Some(OutboundMessage::Audio(_))
        ));
        assert!(matches!(
            adapter.outbound.recv().await,
            Some(OutboundMessage::FinishTurn)
        ));
    }

    #[tokio::test]
    async fn adapter_drop_surfaces_as_stream_end() {
        let (mut session, adapter) = DialogueSession::pair(8);
        drop(adapter);
        assert!(session.next_event().await.is_none());
    }

    #[tokio::test]
    async fn sends_after_close_report_session_closed() {
        let (session, adapter) = DialogueSession::pair(8);
        drop(adapter);
        let err = session.finish_turn().await.unwrap_err();
        assert_eq!(err, DialogueError::SessionClosed);
    }
}
