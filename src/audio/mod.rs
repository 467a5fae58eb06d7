pub mod buffer;
pub mod transcoder;

pub use buffer::AudioBuffer;
pub use transcoder::{decode_file, decode_to_pcm, TARGET_CHANNELS, TARGET_SAMPLE_RATE};
