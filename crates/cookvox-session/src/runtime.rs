//! The session event loop.
//!
//! Single task, single `select!`: UI commands, captured frames, backend
//! events, the response watchdog, and the reconnect timer all funnel into
//! one transition entry point. Entry actions on `Listening` and `Speaking`
//! open exactly one of the capture/playback gates, which is what keeps the
//! microphone and speaker mutually exclusive.

use std::future::pending;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use cookvox_audio::{AudioSystem, PcmFrame, ResponseWatchdog};
use cookvox_command::{classify, VoiceCommand};
use cookvox_dialogue::{BackendEvent, DialogueBackend, TokenProvider};
use cookvox_foundation::{SessionError, SessionStateManager, VoiceSessionState};
use cookvox_recipe::RecipeVoiceContext;
use cookvox_telemetry::SessionMetrics;

use crate::config::SessionConfig;
use crate::connection::Connection;
use crate::events::{SessionCommand, SessionEvent};
use crate::fallback::{dispatch_local, CookModeActions};
use crate::interruption::{InterruptionController, InterruptionEvent, RecoveryAction};
use crate::permissions::{MicPermission, PermissionProbe};

const LOST_CONNECTION: &str = "Lost the connection to the cooking assistant.";

/// Collaborators the runtime is wired with. Everything behind a trait so
/// tests run against the mock backend and fake audio.
pub struct SessionDeps {
    pub backend: Arc<dyn DialogueBackend>,
    pub tokens: Arc<dyn TokenProvider>,
    pub audio: Box<dyn AudioSystem>,
    pub permissions: Arc<dyn PermissionProbe>,
    pub actions: Box<dyn CookModeActions>,
    /// Captured microphone frames, in capture order.
    pub capture_rx: mpsc::Receiver<PcmFrame>,
}

/// Cloneable handle the cook-mode screen keeps. Dropping every handle (or
/// sending [`SessionCommand::Shutdown`]) ends the runtime.
#[derive(Clone)]
pub struct VoiceSessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
    pub metrics: SessionMetrics,
}

impl VoiceSessionHandle {
    pub async fn press_talk(&self) {
        self.send(SessionCommand::PressTalk).await;
    }

    pub async fn release_talk(&self) {
        self.send(SessionCommand::ReleaseTalk).await;
    }

    pub async fn update_context(&self, context: RecipeVoiceContext) {
        self.send(SessionCommand::UpdateContext(context)).await;
    }

    pub async fn local_utterance(&self, text: impl Into<String>) {
        self.send(SessionCommand::LocalUtterance(text.into())).await;
    }

    pub async fn interruption(&self, event: InterruptionEvent) {
        self.send(SessionCommand::Interruption(event)).await;
    }

    pub async fn reset(&self) {
        self.send(SessionCommand::Reset).await;
    }

    pub async fn shutdown(&self) {
        self.send(SessionCommand::Shutdown).await;
    }

    async fn send(&self, cmd: SessionCommand) {
        // A closed channel just means the session is already gone.
        let _ = self.cmd_tx.send(cmd).await;
    }
}

pub struct VoiceSessionRuntime {
    config: SessionConfig,
    state: SessionStateManager,
    connection: Connection,
    audio: Box<dyn AudioSystem>,
    permissions: Arc<dyn PermissionProbe>,
    actions: Box<dyn CookModeActions>,
    interruptions: InterruptionController,
    watchdog: ResponseWatchdog,
    metrics: SessionMetrics,

    cmd_rx: mpsc::Receiver<SessionCommand>,
    capture_rx: mpsc::Receiver<PcmFrame>,
    capture_open: bool,
    event_tx: mpsc::Sender<SessionEvent>,

    frames_this_utterance: u64,
    reconnect_at: Option<Instant>,
    offline: bool,
}

impl VoiceSessionRuntime {
    /// Build and spawn the runtime. Returns the UI handle, the event
    /// stream, and the join handle for teardown.
    pub fn spawn(
        config: SessionConfig,
        deps: SessionDeps,
        initial_context: RecipeVoiceContext,
    ) -> (
        VoiceSessionHandle,
        mpsc::Receiver<SessionEvent>,
        JoinHandle<()>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.channel_capacity);
        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity);
        let metrics = SessionMetrics::default();

        let connection = Connection::new(
            Arc::clone(&deps.backend),
            Arc::clone(&deps.tokens),
            initial_context,
            &config,
        );

        let runtime = Self {
            watchdog: ResponseWatchdog::new(config.response_timeout),
            config,
            state: SessionStateManager::new(),
            connection,
            audio: deps.audio,
            permissions: deps.permissions,
            actions: deps.actions,
            interruptions: InterruptionController::new(),
            metrics: metrics.clone(),
            cmd_rx,
            capture_rx: deps.capture_rx,
            capture_open: true,
            event_tx,
            frames_this_utterance: 0,
            reconnect_at: None,
            offline: false,
        };

        let handle = VoiceSessionHandle { cmd_tx, metrics };
        let join = tokio::spawn(runtime.run());
        (handle, event_rx, join)
    }

    pub async fn run(mut self) {
        tracing::info!(target: "session", "voice session runtime starting");
        // Initial connect goes through the same bounded-backoff machinery
        // as every reconnect.
        self.schedule_next_connect();

        loop {
            let watchdog_deadline = self.watchdog.deadline();
            let reconnect_at = self.reconnect_at;

            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd).await,
                },

                frame = self.capture_rx.recv(), if self.capture_open => match frame {
                    Some(frame) => self.handle_capture_frame(frame).await,
                    None => self.capture_open = false,
                },

                event = self.connection.next_event() => match event {
                    Some(event) => self.handle_backend_event(event).await,
                    None => {
                        self.on_transport_failure("connection dropped", LOST_CONNECTION).await
                    }
                },

                _ = sleep_until_opt(watchdog_deadline) => self.on_response_timeout().await,

                _ = sleep_until_opt(reconnect_at) => self.attempt_connect().await,
            }
        }

        self.teardown();
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::PressTalk => self.on_press_talk(),
            SessionCommand::ReleaseTalk => self.on_release_talk().await,
            SessionCommand::UpdateContext(ctx) => self.on_context_update(ctx).await,
            SessionCommand::LocalUtterance(text) => self.on_utterance(&text, true).await,
            SessionCommand::Interruption(event) => self.on_interruption(event),
            SessionCommand::Reset => self.on_reset(),
            // Handled by the loop before we get here.
            SessionCommand::Shutdown => {}
        }
    }

    // Push-to-talk press: guarded, then Idle -> Listening with capture as
    // the entry action.
    fn on_press_talk(&mut self) {
        if self.state.current() != VoiceSessionState::Idle {
            tracing::debug!(target: "session", state = ?self.state.current(), "press ignored");
            return;
        }
        if self.interruptions.is_interrupted() {
            self.notice("Voice is paused while another app is using audio.");
            return;
        }
        if !self.connection.is_established() {
            if self.offline {
                self.notice(
                    "Cooking assistant is offline. You can still say \"next step\" or set timers.",
                );
            } else {
                self.notice("Still connecting to the cooking assistant…");
            }
            return;
        }
        match self.permissions.microphone() {
            MicPermission::Granted => {}
            MicPermission::Denied | MicPermission::Undetermined => {
                let reason = "Microphone access is off. Allow it in system settings to talk \
                              while you cook."
                    .to_string();
                tracing::warn!(target: "session", "{}", SessionError::PermissionDenied(reason.clone()));
                self.emit(SessionEvent::PermissionDenied { reason });
                return;
            }
        }
        if !self.audio.is_ready() {
            self.notice("Audio devices are unavailable right now.");
            return;
        }

        if self.try_transition(VoiceSessionState::Listening) {
            self.frames_this_utterance = 0;
            self.audio.set_capturing(true);
        }
    }

    // Release: with audio sent it is an utterance (-> Processing), with
    // nothing captured it is a cancellation (-> Idle, never Processing).
    async fn on_release_talk(&mut self) {
        if self.state.current() != VoiceSessionState::Listening {
            return;
        }
        self.audio.set_capturing(false);

        if self.frames_this_utterance == 0 {
            self.metrics
                .utterances_cancelled
                .fetch_add(1, Ordering::Relaxed);
            self.try_transition(VoiceSessionState::Idle);
            return;
        }

        if self.try_transition(VoiceSessionState::Processing) {
            if let Err(e) = self.connection.finish_turn().await {
                self.on_transport_failure(&format!("finish turn failed: {e}"), LOST_CONNECTION)
                    .await;
                return;
            }
            self.watchdog.arm();
        }
    }

    async fn handle_capture_frame(&mut self, frame: PcmFrame) {
        if self.state.current() == VoiceSessionState::Listening
            && self.connection.is_established()
        {
            match self.connection.send_audio(frame).await {
                Ok(()) => {
                    self.frames_this_utterance += 1;
                    self.metrics.frames_sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.on_transport_failure(&format!("audio send failed: {e}"), LOST_CONNECTION)
                        .await;
                }
            }
        } else {
            // The gate closes asynchronously; frames already in flight are
            // dropped here rather than leaking into the next turn.
            self.metrics.frames_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn handle_backend_event(&mut self, event: BackendEvent) {
        self.watchdog.feed();
        match event {
            BackendEvent::Audio(frame) => {
                self.metrics.frames_received.fetch_add(1, Ordering::Relaxed);
                match self.state.current() {
                    VoiceSessionState::Processing => {
                        // Response audio begins. Capture must already be off,
                        // but stopping it again is the invariant's backstop.
                        self.audio.set_capturing(false);
                        if self.try_transition(VoiceSessionState::Speaking) {
                            self.audio.set_playing(true);
                            self.audio.enqueue_playback(&frame);
                        }
                    }
                    VoiceSessionState::Speaking => self.audio.enqueue_playback(&frame),
                    state => {
                        tracing::debug!(target: "session", ?state, "dropping stray audio frame");
                    }
                }
            }
            BackendEvent::Transcript { text, confidence } => {
                tracing::debug!(target: "session", %text, confidence, "backend transcript");
                self.on_utterance(&text, false).await;
            }
            BackendEvent::TurnComplete => {
                self.watchdog.disarm();
                match self.state.current() {
                    VoiceSessionState::Speaking => {
                        if self.try_transition(VoiceSessionState::Idle) {
                            self.audio.set_playing(false);
                        }
                    }
                    // A turn can complete without audio (nothing to say).
                    VoiceSessionState::Processing => {
                        self.try_transition(VoiceSessionState::Idle);
                    }
                    state => {
                        tracing::debug!(target: "session", ?state, "turn complete ignored");
                    }
                }
                self.metrics.mark_turn_completed();
                self.emit(SessionEvent::TurnCompleted);
            }
            BackendEvent::Error { message } => {
                // The raw adapter message stays in the logs; the UI gets
                // generic copy.
                self.on_transport_failure(&message, LOST_CONNECTION).await;
            }
        }
    }

    /// Classify an utterance and dispatch what runs locally. Backend
    /// transcripts only piggyback command extraction: the backend is already
    /// answering queries itself. Local utterances (typed, or recognized
    /// on-device while offline) additionally surface unreachable queries.
    async fn on_utterance(&mut self, text: &str, from_local: bool) {
        let parsed = classify(text);
        match &parsed.command {
            VoiceCommand::Query { question } => {
                self.metrics.query_fallbacks.fetch_add(1, Ordering::Relaxed);
                if from_local && !self.connection.is_established() {
                    self.emit(SessionEvent::QueryUnavailable {
                        question: question.clone(),
                    });
                }
            }
            command => {
                if dispatch_local(command, self.actions.as_mut()) {
                    self.metrics.local_commands.fetch_add(1, Ordering::Relaxed);
                    self.emit(SessionEvent::CommandDispatched {
                        kind: command.kind(),
                        raw_text: parsed.raw_text.clone(),
                    });
                }
            }
        }
    }

    // Out-of-band: remembered for reconnects, forwarded to the live
    // session, no state change. Takes effect for the next turn.
    async fn on_context_update(&mut self, context: RecipeVoiceContext) {
        if let Err(e) = self.connection.update_context(context).await {
            self.on_transport_failure(&format!("context update failed: {e}"), LOST_CONNECTION)
                .await;
        }
    }

    fn on_interruption(&mut self, event: InterruptionEvent) {
        self.metrics.interruptions.fetch_add(1, Ordering::Relaxed);
        match self.interruptions.on_event(event, self.state.current()) {
            RecoveryAction::MuteAndPark => {
                self.audio.set_capturing(false);
                self.audio.set_playing(false);
                self.audio.clear_playback();
                self.watchdog.disarm();
                if matches!(
                    self.state.current(),
                    VoiceSessionState::Listening
                        | VoiceSessionState::Processing
                        | VoiceSessionState::Speaking
                ) {
                    self.try_transition(VoiceSessionState::Idle);
                }
                // The Connection stays alive for reuse after the call.
            }
            RecoveryAction::AnnounceReady { was_listening } => {
                if was_listening {
                    self.notice("Voice is ready. Press to talk to resume.");
                } else {
                    self.notice("Voice is ready again.");
                }
            }
            RecoveryAction::None => {}
        }
    }

    fn on_reset(&mut self) {
        let before = self.state.current();
        let after = self.state.reset();
        if before == VoiceSessionState::Error && after == VoiceSessionState::Idle {
            self.metrics.transitions.fetch_add(1, Ordering::Relaxed);
            self.emit(SessionEvent::StateChanged {
                from: before,
                to: after,
            });
            // A user-driven reset also restarts the connect budget.
            if !self.connection.is_established() {
                self.connection.reset_backoff();
                self.schedule_next_connect();
            }
        }
    }

    async fn on_response_timeout(&mut self) {
        let timeout = self.watchdog.timeout();
        self.watchdog.disarm();
        self.metrics
            .response_timeouts
            .fetch_add(1, Ordering::Relaxed);
        // Distinct copy so repeated timeouts are tellable from hard
        // disconnects in logs and on screen.
        let message = format!("{}", SessionError::ResponseTimeout(timeout));
        self.on_transport_failure(&message, "The assistant took too long to respond.")
            .await;
    }

    /// Any transport-level failure: error state immediately, then bounded
    /// reconnects preserving the last context. `log_message` carries the
    /// detail; `user_message` is the short copy the indicator shows.
    async fn on_transport_failure(&mut self, log_message: &str, user_message: &str) {
        tracing::warn!(target: "session", message = %log_message, "transport failure");
        self.metrics.transport_errors.fetch_add(1, Ordering::Relaxed);

        self.audio.set_capturing(false);
        self.audio.set_playing(false);
        self.audio.clear_playback();
        self.watchdog.disarm();
        self.connection.teardown();

        let from = self.state.current();
        self.state.fail(log_message);
        if from != VoiceSessionState::Error {
            self.metrics.transitions.fetch_add(1, Ordering::Relaxed);
            self.emit(SessionEvent::StateChanged {
                from,
                to: VoiceSessionState::Error,
            });
            self.notice(user_message);
        }

        self.schedule_next_connect();
    }

    fn schedule_next_connect(&mut self) {
        match self.connection.next_backoff() {
            Some(delay) => {
                tracing::debug!(target: "session", ?delay, attempt = self.connection.attempts(), "connect scheduled");
                self.reconnect_at = Some(Instant::now() + delay);
            }
            None => self.go_offline(),
        }
    }

    async fn attempt_connect(&mut self) {
        self.reconnect_at = None;
        self.metrics
            .reconnect_attempts
            .fetch_add(1, Ordering::Relaxed);

        match self.connection.establish(self.config.connect_timeout).await {
            Ok(()) => {
                tracing::info!(target: "session", "connected to dialogue backend");
                self.metrics
                    .reconnects_succeeded
                    .fetch_add(1, Ordering::Relaxed);
                self.connection.reset_backoff();

                if self.offline {
                    self.offline = false;
                    self.metrics.set_offline(false);
                    self.emit(SessionEvent::OfflineChanged { offline: false });
                }
                if self.state.current() == VoiceSessionState::Error {
                    self.state.reset();
                    self.metrics.transitions.fetch_add(1, Ordering::Relaxed);
                    self.emit(SessionEvent::StateChanged {
                        from: VoiceSessionState::Error,
                        to: VoiceSessionState::Idle,
                    });
                    self.notice("Reconnected to the cooking assistant.");
                }
            }
            Err(e) => {
                let timed_out = matches!(e, SessionError::ResponseTimeout(_));
                tracing::warn!(target: "session", error = %e, timed_out, "connect attempt failed");
                self.schedule_next_connect();
            }
        }
    }

    /// Retries exhausted: persistent offline indicator, local commands only.
    fn go_offline(&mut self) {
        let attempts = self.connection.attempts();
        tracing::error!(target: "session", "{}", SessionError::ReconnectExhausted { attempts });

        if self.state.current() != VoiceSessionState::Error {
            let from = self.state.current();
            self.state.fail("assistant unreachable");
            self.metrics.transitions.fetch_add(1, Ordering::Relaxed);
            self.emit(SessionEvent::StateChanged {
                from,
                to: VoiceSessionState::Error,
            });
        }

        if !self.offline {
            self.offline = true;
            self.metrics.set_offline(true);
            self.emit(SessionEvent::OfflineChanged { offline: true });
            self.notice(
                "Cooking assistant is offline. Step navigation and timers still work by voice.",
            );
        }
    }

    // Leaving cook mode tears everything down unconditionally; there is no
    // background voice session.
    fn teardown(&mut self) {
        self.audio.set_capturing(false);
        self.audio.set_playing(false);
        self.audio.clear_playback();
        self.connection.teardown();
        tracing::info!(target: "session", "voice session ended: {}", self.metrics.summary());
    }

    fn try_transition(&mut self, to: VoiceSessionState) -> bool {
        match self.state.transition(to) {
            Ok(change) => {
                self.metrics.transitions.fetch_add(1, Ordering::Relaxed);
                self.emit(SessionEvent::StateChanged {
                    from: change.from,
                    to: change.to,
                });
                true
            }
            Err(e) => {
                self.metrics
                    .rejected_transitions
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!(target: "session", error = %e, "transition rejected");
                false
            }
        }
    }

    fn notice(&mut self, message: &str) {
        self.emit(SessionEvent::Notice {
            message: message.to_string(),
        });
    }

    // Events are best-effort: a slow UI loses notices rather than stalling
    // the audio path.
    fn emit(&mut self, event: SessionEvent) {
        if self.event_tx.try_send(event).is_err() {
            tracing::debug!(target: "session", "event dropped: ui channel full or closed");
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => pending().await,
    }
}
