use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scheduling priority attached to a finalized transcription job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Normal,
    Low,
}

/// Sample payload of an `AudioData` message.
///
/// This client always sends `Integer`; the `Float` arm exists because the
/// wire format defines it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SampleData {
    Integer(Vec<i16>),
    Float(Vec<f32>),
}

/// Messages sent by the client to the transcription service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Opens a new streaming session identified by `id`.
    InitializeStreaming { id: Uuid },
    /// Describes the PCM that will follow. Not acknowledged by the service.
    AudioDataDetails {
        id: Uuid,
        sample_rate: u32,
        channels: u8,
        denoise_audio: bool,
    },
    /// One chunk of interleaved PCM samples.
    AudioData { id: Uuid, data: SampleData },
    /// Ends the stream and requests the transcript.
    FinalizeStreaming {
        id: Uuid,
        translate: bool,
        verbose: bool,
        language: String,
        priority: Priority,
    },
}

/// Messages sent by the service to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServiceMessage {
    /// Sent once, unsolicited, immediately after the connection opens.
    /// The utilization fields are informational; this client surfaces them
    /// to the caller and does not gate admission on them.
    StatusConnectionOpen {
        max_utilization: f64,
        can_overload: bool,
    },
    /// Acknowledges `InitializeStreaming`.
    InitializationComplete {},
    /// Terminal result for the session identified by `id`.
    SttResult { id: Uuid, result: String },
}
