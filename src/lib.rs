pub mod audio;
pub mod config;
pub mod error;
pub mod protocol;
pub mod stt;

pub use audio::{decode_file, decode_to_pcm, AudioBuffer};
pub use config::{Config, SttConfig};
pub use error::{Error, Result};
pub use stt::{
    Connection, ConnectionTimeouts, ServiceStatus, SessionOptions, SessionState, StreamingSession,
    Transcriber,
};
