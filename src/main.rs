use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use voicescribe::{audio, Config, Transcriber};

#[derive(Parser)]
#[command(name = "voicescribe", about = "Streaming speech-to-text client")]
struct Cli {
    /// Configuration file name (without extension).
    #[arg(long, default_value = "voicescribe")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to the service and report its status.
    Check {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Transcribe an audio file (Ogg/Opus or WAV).
    Transcribe {
        /// Path to the audio file.
        file: String,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Transcription language code.
        #[arg(long)]
        language: Option<String>,
        /// Skip server-side denoising.
        #[arg(long)]
        no_denoise: bool,
        /// Downmix stereo input to mono before streaming.
        #[arg(long)]
        mono: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Command::Check { host, port } => {
            apply_overrides(&mut config, host, port);
            let transcriber = Transcriber::new(config.stt.clone());
            let status = transcriber.check().await?;
            println!(
                "service ok (max utilization {:.2}, can overload: {})",
                status.max_utilization, status.can_overload
            );
        }
        Command::Transcribe {
            file,
            host,
            port,
            language,
            no_denoise,
            mono,
        } => {
            apply_overrides(&mut config, host, port);
            if let Some(language) = language {
                config.stt.language = language;
            }
            if no_denoise {
                config.stt.denoise = false;
            }

            let transcriber = Transcriber::new(config.stt.clone());
            let result = if mono {
                let bytes = tokio::fs::read(&file).await?;
                let buffer = audio::decode_to_pcm(&bytes)?.downmix_to_mono();
                transcriber
                    .transcribe_buffer(&buffer, CancellationToken::new())
                    .await
            } else {
                transcriber.transcribe_file(&file).await
            };

            match result {
                Ok(transcript) => {
                    info!(chars = transcript.len(), "transcription finished");
                    println!("{transcript}");
                }
                Err(e) => {
                    error!("transcription failed: {e}");
                    bail!("could not transcribe the audio");
                }
            }
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, host: Option<String>, port: Option<u16>) {
    if let Some(host) = host {
        config.stt.host = host;
    }
    if let Some(port) = port {
        config.stt.port = port;
    }
}
