use std::path::Path;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::audio::{self, AudioBuffer};
use crate::config::SttConfig;
use crate::error::Result;
use crate::stt::connection::{Connection, ServiceStatus};
use crate::stt::session::{SessionOptions, StreamingSession};

/// High-level entry point tying decoding, connection, and session together.
///
/// Each call opens a fresh connection and runs exactly one session on it,
/// then closes the connection. The service protocol is sequential, so
/// concurrent transcriptions should use separate `Transcriber` calls
/// rather than sharing a connection.
pub struct Transcriber {
    config: SttConfig,
}

impl Transcriber {
    pub fn new(config: SttConfig) -> Self {
        Self { config }
    }

    /// Connect, read the handshake, and hang up. Useful as a liveness probe.
    pub async fn check(&self) -> Result<ServiceStatus> {
        let (mut conn, status) = self.connect().await?;
        conn.shutdown().await;
        info!(
            max_utilization = status.max_utilization,
            can_overload = status.can_overload,
            "service reachable"
        );
        Ok(status)
    }

    /// Transcribe an audio file (Ogg/Opus or WAV).
    pub async fn transcribe_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        self.transcribe_bytes(bytes).await
    }

    /// Transcribe compressed audio bytes.
    pub async fn transcribe_bytes(&self, bytes: Vec<u8>) -> Result<String> {
        self.transcribe_bytes_with_cancel(bytes, CancellationToken::new())
            .await
    }

    /// Transcribe compressed audio bytes, aborting early if `cancel` fires.
    pub async fn transcribe_bytes_with_cancel(
        &self,
        bytes: Vec<u8>,
        cancel: CancellationToken,
    ) -> Result<String> {
        // Opus decode is CPU-bound; keep it off the async workers.
        let buffer = tokio::task::spawn_blocking(move || audio::decode_to_pcm(&bytes))
            .await
            .map_err(std::io::Error::other)??;
        self.transcribe_buffer(&buffer, cancel).await
    }

    /// Stream decoded PCM through one full session.
    pub async fn transcribe_buffer(
        &self,
        audio: &AudioBuffer,
        cancel: CancellationToken,
    ) -> Result<String> {
        let (mut conn, status) = self.connect().await?;
        debug!(
            max_utilization = status.max_utilization,
            duration_secs = audio.duration_seconds(),
            "starting transcription session"
        );

        let mut session = StreamingSession::with_cancel(self.options(), cancel);
        let result = session.transcribe(&mut conn, audio).await;
        conn.shutdown().await;
        result
    }

    async fn connect(&self) -> Result<(Connection<TcpStream>, ServiceStatus)> {
        Connection::connect(&self.config.host, self.config.port, self.config.timeouts()).await
    }

    fn options(&self) -> SessionOptions {
        SessionOptions {
            language: self.config.language.clone(),
            denoise: self.config.denoise,
            ..SessionOptions::default()
        }
    }
}
