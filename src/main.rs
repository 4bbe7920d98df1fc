use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;

use voicechat::audio::{CaptureDevice, PlaybackDevice};
use voicechat::{AppConfig, CpalCapture, CpalPlayback, RealtimeModel, RealtimeVoice, VoiceSession};

/// Real-time voice chat client for OpenAI's Realtime API
#[derive(Parser, Debug)]
#[command(name = "voicechat")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Realtime model to converse with
    #[arg(long, value_name = "MODEL")]
    model: Option<String>,

    /// Voice for the assistant's audio
    #[arg(long, value_name = "VOICE")]
    voice: Option<String>,

    /// File containing system instructions for the assistant
    #[arg(long = "instructions-file", value_name = "FILE")]
    instructions_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if it exists (must happen before config resolution)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::from_env()?,
    };

    // CLI flags override file and environment
    if let Some(model) = cli.model {
        config.model = RealtimeModel::from_str_or_default(&model);
    }
    if let Some(voice) = cli.voice {
        config.voice = RealtimeVoice::from_str_or_default(&voice);
    }
    if let Some(path) = cli.instructions_file {
        config.instructions = std::fs::read_to_string(&path)
            .map_err(|e| anyhow!("failed to read {}: {}", path.display(), e))?;
    }

    let capture = Arc::new(CpalCapture::open()?);
    let playback = Arc::new(CpalPlayback::open()?);

    let session = VoiceSession::new(
        config.realtime_options(),
        Arc::clone(&capture) as Arc<dyn CaptureDevice>,
        Arc::clone(&playback) as Arc<dyn PlaybackDevice>,
    );

    tokio::select! {
        result = session.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
            capture.close();
            playback.close();
        }
    }

    Ok(())
}
