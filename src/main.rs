use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use tracing::info;

use aiui_session::{
    AiuiSession, ClientConfig, DataMode, FileAudioSink, FileAudioSource, SessionPayload,
};

/// AIUI session client - one text or audio turn against the AIUI v3 service
#[derive(Parser, Debug)]
#[command(name = "aiui-session")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Send this text as a single turn
    #[arg(long, value_name = "TEXT", conflicts_with = "audio")]
    text: Option<String>,

    /// Stream this raw 16 kHz 16-bit mono PCM file
    #[arg(long, value_name = "FILE")]
    audio: Option<PathBuf>,

    /// Directory for synthesized audio
    #[arg(long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Needed for wss:// endpoints
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ClientConfig::from_file(path)?
        }
        None => ClientConfig::from_env()?,
    };

    if let Some(text) = cli.text {
        config.data_mode = DataMode::Text;
        config.text = text;
    }
    if let Some(audio) = cli.audio {
        config.data_mode = DataMode::Audio;
        config.audio_path = Some(audio);
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    config.validate_request()?;

    let payload = match config.data_mode {
        DataMode::Text => SessionPayload::Text(config.text.clone()),
        DataMode::Audio => {
            let path = config
                .audio_path
                .as_ref()
                .ok_or_else(|| anyhow!("No audio file configured"))?;
            let source = FileAudioSource::open(path)
                .await
                .map_err(|e| anyhow!("Failed to open audio file {}: {}", path.display(), e))?;
            SessionPayload::Audio(Box::new(source))
        }
    };

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| {
            anyhow!(
                "Failed to create output directory {}: {}",
                config.output_dir.display(),
                e
            )
        })?;
    let sink = Arc::new(FileAudioSink::new(config.output_dir.clone()));

    info!(
        mode = %config.data_mode,
        scene = %config.scene,
        sn = %config.sn,
        "Starting AIUI session"
    );

    let report = AiuiSession::new(config.aiui_config())
        .on_event(Arc::new(|event| {
            Box::pin(async move {
                println!("{event}");
            })
        }))
        .run(payload, sink)
        .await?;

    println!(
        "session {} finished: {} frame(s) sent",
        report.sid.as_deref().unwrap_or("-"),
        report.frames_sent
    );
    if let Some(output) = &report.audio_output {
        println!(
            "audio saved to {} ({} bytes, {} chunks)",
            config.output_dir.join(&output.name).display(),
            output.bytes,
            output.chunks
        );
    }

    Ok(())
}
