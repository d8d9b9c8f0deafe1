//! Demo wiring: real (or fake) audio, the mock dialogue backend, and a
//! stdin console standing in for the cook-mode screen.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use cookvox_audio::{AudioSystem, CaptureConfig, CpalAudioSystem, FakeAudioSystem, PcmFrame};
use cookvox_dialogue::{MockBackendConfig, MockDialogueBackend, StaticTokenProvider};
use cookvox_foundation::ShutdownHandler;
use cookvox_recipe::{build_voice_context, Ingredient, Recipe};
use cookvox_session::{
    BackoffConfig, CookModeActions, GrantedPermissions, InterruptionEvent, SessionConfig,
    SessionDeps, SessionEvent, VoiceSessionRuntime,
};

pub struct RuntimeOptions {
    pub device: Option<String>,
    pub output_device: Option<String>,
    pub fake_audio: bool,
    pub max_attempts: u32,
    pub response_timeout_secs: u64,
    pub fail_connects: u32,
    pub transcript: String,
}

/// Screen-side handlers: the demo just narrates them.
struct ConsoleActions {
    step: usize,
    steps: usize,
    scale: f64,
}

impl ConsoleActions {
    fn new(recipe: &Recipe) -> Self {
        Self {
            step: 0,
            steps: recipe.instructions.len(),
            scale: 1.0,
        }
    }
}

impl CookModeActions for ConsoleActions {
    fn next_step(&mut self) {
        self.step = (self.step + 1).min(self.steps.saturating_sub(1));
        info!(target: "cook", step = self.step, "next step");
    }

    fn previous_step(&mut self) {
        self.step = self.step.saturating_sub(1);
        info!(target: "cook", step = self.step, "previous step");
    }

    fn go_to_step(&mut self, step: usize) {
        self.step = step.min(self.steps.saturating_sub(1));
        info!(target: "cook", step = self.step, "go to step");
    }

    fn repeat_step(&mut self) {
        info!(target: "cook", step = self.step, "repeat step");
    }

    fn start_timer(&mut self, duration: Option<Duration>) {
        info!(target: "cook", ?duration, "start timer");
    }

    fn stop_timer(&mut self) {
        info!(target: "cook", "stop timer");
    }

    fn scale_to_multiplier(&mut self, multiplier: f64) {
        self.scale = multiplier;
        info!(target: "cook", multiplier, "scale recipe");
    }

    fn scale_to_servings(&mut self, servings: u32) {
        info!(target: "cook", servings, "scale to servings");
    }
}

fn demo_recipe() -> Recipe {
    Recipe {
        id: "demo-dal".into(),
        title: "Weeknight Dal".into(),
        ingredients: vec![
            Ingredient::new("red lentils", 1.5, "cups"),
            Ingredient::new("turmeric", 0.5, "tsp"),
            Ingredient::new("coconut milk", 1.0, "can"),
        ],
        instructions: vec![
            "Rinse the lentils until the water runs clear.".into(),
            "Simmer with turmeric for 20 minutes.".into(),
            "Stir in coconut milk and season.".into(),
        ],
        base_servings: Some(4),
    }
}

pub async fn run(options: RuntimeOptions) -> anyhow::Result<()> {
    let shutdown = ShutdownHandler::new().install();

    // --- Audio ---
    type AudioParts = (Box<dyn AudioSystem>, mpsc::Receiver<PcmFrame>, u32, u32);
    let (audio, capture_rx, input_rate, output_rate): AudioParts = if options.fake_audio {
        let (capture_tx, capture_rx) = mpsc::channel(64);
        spawn_fake_mic(capture_tx);
        (Box::new(FakeAudioSystem::new()), capture_rx, 16_000, 16_000)
    } else {
        let capture_config = CaptureConfig {
            device: options.device.clone(),
            ..Default::default()
        };
        let (system, capture_rx) =
            CpalAudioSystem::open(capture_config, options.output_device.clone())
                .context("opening audio devices (try --fake-audio)")?;
        let rates = (system.capture_sample_rate(), system.playback_sample_rate());
        info!(capture_rate = rates.0, playback_rate = rates.1, "audio devices ready");
        (Box::new(system), capture_rx, rates.0, rates.1)
    };

    // --- Dialogue backend (mock adapter) ---
    let backend = Arc::new(MockDialogueBackend::new(MockBackendConfig {
        fail_first_connects: options.fail_connects,
        transcript: Some(options.transcript.clone()),
        reply_frames: 25,
        reply_delay: Duration::from_millis(300),
        ..Default::default()
    }));

    // --- Session ---
    let recipe = demo_recipe();
    let config = SessionConfig {
        response_timeout: Duration::from_secs(options.response_timeout_secs),
        backoff: BackoffConfig {
            max_attempts: options.max_attempts,
            ..Default::default()
        },
        input_sample_rate: input_rate,
        output_sample_rate: output_rate,
        ..Default::default()
    };

    let deps = SessionDeps {
        backend,
        tokens: Arc::new(StaticTokenProvider::new("demo-token")),
        audio,
        permissions: Arc::new(GrantedPermissions),
        actions: Box::new(ConsoleActions::new(&recipe)),
        capture_rx,
    };

    let initial_context = build_voice_context(&recipe, 0, 1.0);
    let (handle, mut events, join) = VoiceSessionRuntime::spawn(config, deps, initial_context);

    // --- Event printer ---
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::StateChanged { from, to } => {
                    info!(target: "ui", ?from, ?to, "state");
                }
                SessionEvent::OfflineChanged { offline } => {
                    info!(target: "ui", offline, "offline indicator");
                }
                SessionEvent::PermissionDenied { reason } => {
                    info!(target: "ui", %reason, "microphone permission");
                }
                SessionEvent::CommandDispatched { kind, raw_text } => {
                    info!(target: "ui", kind, %raw_text, "command dispatched");
                }
                SessionEvent::QueryUnavailable { question } => {
                    info!(target: "ui", %question, "assistant needed but offline");
                }
                SessionEvent::TurnCompleted => info!(target: "ui", "turn complete"),
                SessionEvent::Notice { message } => info!(target: "ui", %message, "notice"),
            }
        }
    });

    // --- Console: stands in for the cook-mode screen ---
    println!("commands: press | release | say <text> | step <n> | scale <x> | call | endcall | reset | quit");
    let recipe_for_context = recipe.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut current_step = 0usize;
    let mut current_scale = 1.0f64;

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let line = line.trim();
                let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
                match cmd {
                    "press" => handle.press_talk().await,
                    "release" => handle.release_talk().await,
                    "say" => handle.local_utterance(rest).await,
                    "step" => {
                        if let Ok(step) = rest.trim().parse::<usize>() {
                            current_step = step;
                            let ctx = build_voice_context(&recipe_for_context, current_step, current_scale);
                            handle.update_context(ctx).await;
                        }
                    }
                    "scale" => {
                        if let Ok(scale) = rest.trim().parse::<f64>() {
                            current_scale = scale;
                            let ctx = build_voice_context(&recipe_for_context, current_step, current_scale);
                            handle.update_context(ctx).await;
                        }
                    }
                    "call" => handle.interruption(InterruptionEvent::AudioInterruptionBegan).await,
                    "endcall" => handle.interruption(InterruptionEvent::AudioInterruptionEnded).await,
                    "reset" => handle.reset().await,
                    "quit" => break,
                    "" => {}
                    other => println!("unknown command: {other}"),
                }
            }
        }
    }

    info!("Leaving cook mode; tearing the session down");
    handle.shutdown().await;
    let _ = join.await;
    printer.abort();
    info!("{}", handle.metrics.summary());
    Ok(())
}

/// Synthetic microphone for `--fake-audio`: a steady 20 ms frame cadence,
/// gated downstream exactly like the real capture thread.
fn spawn_fake_mic(capture_tx: mpsc::Sender<PcmFrame>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(20));
        loop {
            ticker.tick().await;
            let frame = PcmFrame::from_samples(vec![0i16; 320], 16_000);
            if capture_tx.send(frame).await.is_err() {
                break;
            }
        }
    });
}
