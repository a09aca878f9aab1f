use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use legado_voice::{
    Config, InterviewConfig, InterviewSession, LiveServiceConfig, MicrophoneBackend,
    WebSocketChannel,
};

/// Run a live voice interview against the configured inference service.
#[derive(Parser, Debug)]
#[command(name = "legado-voice", version)]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/legado-voice")]
    config: String,

    /// Stop the interview after this many seconds (0 = until ctrl-c)
    #[arg(long, default_value_t = 0)]
    duration_secs: u64,

    /// Directory the sealed recording is written to
    #[arg(long, default_value = "recordings")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let api_key = std::env::var(&cfg.live.api_key_env)
        .with_context(|| format!("missing API key in ${}", cfg.live.api_key_env))?;

    let interview = InterviewConfig {
        system_prompt: cfg.interview.system_prompt.clone(),
        opening_question: cfg.interview.opening_question.clone(),
        sample_rate: cfg.audio.sample_rate,
        frame_duration_ms: cfg.audio.frame_duration_ms,
        ..InterviewConfig::default()
    };

    let backend = MicrophoneBackend::new(legado_voice::CaptureConfig {
        target_sample_rate: cfg.audio.sample_rate,
        target_channels: cfg.audio.channels,
        frame_duration_ms: cfg.audio.frame_duration_ms,
    });

    let channel = WebSocketChannel::new(LiveServiceConfig {
        url: cfg.live.url.clone(),
        api_key,
    });

    let mut session = InterviewSession::new(interview, Box::new(backend), Box::new(channel));

    session.start().await?;
    info!("Interview started (session {}); press ctrl-c to finish", session.id());

    if args.duration_secs > 0 {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(args.duration_secs)) => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    } else {
        tokio::signal::ctrl_c().await?;
    }

    let outcome = session.finish().await?;

    println!("\n--- Transcript ({} turns) ---", outcome.turns.len());
    println!("{}", outcome.transcript);

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {:?}", args.output_dir))?;
    let wav_path = args.output_dir.join(format!("{}.wav", session.id()));
    std::fs::write(&wav_path, &outcome.audio.bytes)
        .with_context(|| format!("failed to write {:?}", wav_path))?;

    info!(
        "Recording saved to {:?} ({:.1}s, {} bytes)",
        wav_path,
        outcome.audio.duration.as_secs_f64(),
        outcome.audio.bytes.len()
    );

    if outcome.turns.is_empty() {
        warn!("No turns were finalized during this session");
    }

    Ok(())
}
