//! Client for the streaming transcription service.

pub mod connection;
pub mod session;
pub mod transcriber;

pub use connection::{Connection, ConnectionTimeouts, ServiceStatus};
pub use session::{SessionOptions, SessionState, StreamingSession, CHUNK_SAMPLES_PER_CHANNEL};
pub use transcriber::Transcriber;
