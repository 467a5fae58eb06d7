//! Wire protocol for the transcription service.
//!
//! Every message travels in a frame of `[4-byte magic "scri"] [8-byte
//! big-endian payload length] [payload]`, where the payload is one
//! MessagePack-encoded tagged-union message. Framing and payload decoding
//! are deliberately separate: the connection reassembles complete frames
//! from partial reads before the payload decoder ever runs.

pub mod frame;
pub mod message;

pub use frame::{decode_payload, encode_frame, FrameAccumulator, MAGIC};
pub use message::{ClientMessage, Priority, SampleData, ServiceMessage};
