mod runtime;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use runtime::RuntimeOptions;

/// Voice cooking assistant session, wired against the mock dialogue backend.
#[derive(Parser, Debug)]
#[command(name = "cookvox", version, about)]
struct Cli {
    /// Input device name; the host default is used when omitted.
    #[arg(long)]
    device: Option<String>,

    /// Output device name; the host default is used when omitted.
    #[arg(long)]
    output_device: Option<String>,

    /// Run without opening real audio devices.
    #[arg(long)]
    fake_audio: bool,

    /// Connect attempts before the session goes offline.
    #[arg(long, default_value_t = 3, env = "COOKVOX_MAX_ATTEMPTS")]
    max_attempts: u32,

    /// Seconds to wait for a backend response after an utterance.
    #[arg(long, default_value_t = 20, env = "COOKVOX_RESPONSE_TIMEOUT")]
    response_timeout_secs: u64,

    /// Make the mock backend reject this many handshakes first, to watch
    /// the backoff/offline path.
    #[arg(long, default_value_t = 0)]
    fail_connects: u32,

    /// Transcript the mock backend "hears" for every turn.
    #[arg(long, default_value = "set a timer for 10 minutes")]
    transcript: String,
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "cookvox.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(guard);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().map_err(|e| anyhow::anyhow!("logging setup failed: {e}"))?;
    let cli = Cli::parse();
    tracing::info!("Starting CookVox voice session demo");

    let options = RuntimeOptions {
        device: cli.device,
        output_device: cli.output_device,
        fake_audio: cli.fake_audio,
        max_attempts: cli.max_attempts,
        response_timeout_secs: cli.response_timeout_secs,
        fail_connects: cli.fail_connects,
        transcript: cli.transcript,
    };

    runtime::run(options).await
}
