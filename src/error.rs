use thiserror::Error;

/// Errors surfaced by the transcription core.
///
/// `Connect` failures may be retried with backoff. `Protocol` failures are
/// fatal for the connection they occurred on. `AudioDecode` failures are
/// fatal for the request (the input itself is bad). `Io` failures mid-session
/// leave the connection unusable; the whole request may be retried on a
/// fresh one.
#[derive(Debug, Error)]
pub enum Error {
    #[error("connect error: {0}")]
    Connect(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("audio decode error: {0}")]
    AudioDecode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transcription cancelled")]
    Cancelled,
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Protocol(format!("failed to encode message: {e}"))
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Protocol(format!("malformed message payload: {e}"))
    }
}

impl From<audiopus::Error> for Error {
    fn from(e: audiopus::Error) -> Self {
        Error::AudioDecode(format!("opus: {e}"))
    }
}

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::AudioDecode(format!("wav: {e}"))
    }
}

impl From<ogg::OggReadError> for Error {
    fn from(e: ogg::OggReadError) -> Self {
        Error::AudioDecode(format!("ogg: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
