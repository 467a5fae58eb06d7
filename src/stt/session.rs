use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audio::AudioBuffer;
use crate::error::{Error, Result};
use crate::protocol::message::{ClientMessage, Priority, SampleData, ServiceMessage};
use crate::stt::connection::Connection;

/// Samples per channel carried by one `AudioData` message. A chunk totals
/// `CHUNK_SAMPLES_PER_CHANNEL * channels` interleaved samples.
pub const CHUNK_SAMPLES_PER_CHANNEL: usize = 240;

/// Lifecycle of one transcription request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Initialized,
    DetailsSent,
    Streaming,
    Finalized,
    Completed,
    Failed,
}

/// Options forwarded to the service with the stream.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub language: String,
    pub denoise: bool,
    pub translate: bool,
    pub verbose: bool,
    pub priority: Priority,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            denoise: true,
            translate: false,
            verbose: false,
            priority: Priority::High,
        }
    }
}

/// One correlated transcription request, progressing through the four
/// protocol phases over an exclusively borrowed connection.
///
/// The session identifier is freshly generated per request and never
/// reused. Phase methods enforce ordering: calling one out of turn is a
/// protocol error that touches neither the wire nor the session state.
pub struct StreamingSession {
    id: Uuid,
    state: SessionState,
    options: SessionOptions,
    cancel: CancellationToken,
}

impl StreamingSession {
    pub fn new(options: SessionOptions) -> Self {
        Self::with_cancel(options, CancellationToken::new())
    }

    /// Create a session whose suspension points race against `cancel`.
    pub fn with_cancel(options: SessionOptions, cancel: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Created,
            options,
            cancel,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run all phases in order and return the transcript.
    pub async fn transcribe<S>(
        &mut self,
        conn: &mut Connection<S>,
        audio: &AudioBuffer,
    ) -> Result<String>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.initialize(conn).await?;
        self.send_details(conn, audio).await?;
        self.stream_audio(conn, audio).await?;
        self.finalize(conn).await?;
        self.await_result(conn).await
    }

    /// Open the stream and wait for the service's acknowledgement.
    pub async fn initialize<S>(&mut self, conn: &mut Connection<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.guard("initialize", &[SessionState::Created])?;
        let id = self.id;
        debug!(%id, "initializing stream");

        let cancel = self.cancel.clone();
        let result = race_cancel(&cancel, async {
            conn.send(&ClientMessage::InitializeStreaming { id }).await?;
            match conn.receive().await? {
                ServiceMessage::InitializationComplete {} => Ok(()),
                other => Err(Error::Protocol(format!(
                    "expected InitializationComplete, got {other:?}"
                ))),
            }
        })
        .await;
        self.advance(result, SessionState::Initialized)
    }

    /// Describe the PCM that will follow. The service does not acknowledge
    /// this message.
    pub async fn send_details<S>(
        &mut self,
        conn: &mut Connection<S>,
        audio: &AudioBuffer,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.guard("send_details", &[SessionState::Initialized])?;
        let message = ClientMessage::AudioDataDetails {
            id: self.id,
            sample_rate: audio.sample_rate,
            channels: audio.channels,
            denoise_audio: self.options.denoise,
        };
        debug!(id = %self.id, audio.sample_rate, audio.channels, "sending audio details");

        let cancel = self.cancel.clone();
        let result = race_cancel(&cancel, conn.send(&message)).await;
        self.advance(result, SessionState::DetailsSent)
    }

    /// Send the whole buffer as ordered fixed-size chunks.
    pub async fn stream_audio<S>(
        &mut self,
        conn: &mut Connection<S>,
        audio: &AudioBuffer,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.guard(
            "stream_audio",
            &[SessionState::DetailsSent, SessionState::Streaming],
        )?;
        let id = self.id;

        let cancel = self.cancel.clone();
        let result = race_cancel(&cancel, async {
            let mut chunks = 0usize;
            for chunk in audio.chunks(CHUNK_SAMPLES_PER_CHANNEL) {
                conn.send(&ClientMessage::AudioData {
                    id,
                    data: SampleData::Integer(chunk.to_vec()),
                })
                .await?;
                chunks += 1;
            }
            debug!(%id, chunks, total_samples = audio.samples.len(), "audio streamed");
            Ok(())
        })
        .await;
        self.advance(result, SessionState::Streaming)
    }

    /// End the stream and request the transcript.
    pub async fn finalize<S>(&mut self, conn: &mut Connection<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.guard("finalize", &[SessionState::Streaming])?;
        let message = ClientMessage::FinalizeStreaming {
            id: self.id,
            translate: self.options.translate,
            verbose: self.options.verbose,
            language: self.options.language.clone(),
            priority: self.options.priority,
        };
        debug!(id = %self.id, language = %self.options.language, "finalizing stream");

        let cancel = self.cancel.clone();
        let result = race_cancel(&cancel, conn.send(&message)).await;
        self.advance(result, SessionState::Finalized)
    }

    /// Wait for this session's terminal result, skipping anything else the
    /// service sends in the meantime.
    pub async fn await_result<S>(&mut self, conn: &mut Connection<S>) -> Result<String>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.guard("await_result", &[SessionState::Finalized])?;
        let id = self.id;

        let cancel = self.cancel.clone();
        let result = race_cancel(&cancel, async {
            loop {
                match conn.receive().await? {
                    ServiceMessage::SttResult {
                        id: result_id,
                        result,
                    } if result_id == id => return Ok(result),
                    other => {
                        warn!(%id, ?other, "ignoring non-terminal message while awaiting result");
                    }
                }
            }
        })
        .await;

        let transcript = self.advance(result, SessionState::Completed)?;
        info!(%id, chars = transcript.len(), "transcription complete");
        Ok(transcript)
    }

    fn guard(&self, phase: &str, allowed: &[SessionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(Error::Protocol(format!(
            "{phase} called in session state {:?}",
            self.state
        )))
    }

    fn advance<T>(&mut self, result: Result<T>, next: SessionState) -> Result<T> {
        match result {
            Ok(value) => {
                self.state = next;
                Ok(value)
            }
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }
}

async fn race_cancel<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}
