use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Magic marker opening every frame ("scri").
pub const MAGIC: [u8; 4] = [0x73, 0x63, 0x72, 0x69];

/// Fixed header size: magic plus the big-endian u64 payload length.
const HEADER_LEN: usize = MAGIC.len() + 8;

/// Serialize a message and wrap it in a complete frame.
///
/// Structs serialize as string-keyed maps and unit enum variants as strings,
/// which is the shape the service reads. No payload length cap is enforced
/// here; the service is trusted to reject oversized payloads.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let payload = rmp_serde::to_vec_named(message)?;
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Deserialize one message from a complete payload buffer.
///
/// Unknown tags and truncated payloads are protocol errors.
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    Ok(rmp_serde::from_slice(payload)?)
}

/// Reassembles complete frame payloads from arbitrarily fragmented reads.
///
/// Bytes accumulate in three steps: 4 magic bytes (validated), 8 length
/// bytes (big-endian u64), then exactly `length` payload bytes. Bytes past
/// the current frame boundary are retained as the start of the next frame's
/// header.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    buf: Vec<u8>,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes received from the stream.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Take the next complete payload, if one has accumulated.
    ///
    /// A magic mismatch at a frame boundary is fatal for the connection;
    /// the payload is never decoded in that case.
    pub fn next_payload(&mut self) -> Result<Option<Vec<u8>>> {
        if self.buf.len() < MAGIC.len() {
            return Ok(None);
        }
        if self.buf[..MAGIC.len()] != MAGIC {
            return Err(Error::Protocol(format!(
                "invalid magic bytes {:02x?}",
                &self.buf[..MAGIC.len()]
            )));
        }
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&self.buf[MAGIC.len()..HEADER_LEN]);
        let payload_len = u64::from_be_bytes(len_bytes) as usize;
        if self.buf.len() < HEADER_LEN + payload_len {
            return Ok(None);
        }
        let payload = self.buf[HEADER_LEN..HEADER_LEN + payload_len].to_vec();
        self.buf.drain(..HEADER_LEN + payload_len);
        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::{ClientMessage, ServiceMessage};
    use uuid::Uuid;

    #[test]
    fn frame_layout() {
        let message = ClientMessage::InitializeStreaming { id: Uuid::new_v4() };
        let frame = encode_frame(&message).unwrap();

        assert_eq!(&frame[..4], &MAGIC);
        let len = u64::from_be_bytes(frame[4..12].try_into().unwrap());
        assert_eq!(len as usize, frame.len() - 12);
    }

    #[test]
    fn payload_is_keyed_by_field_name() {
        let message = ClientMessage::InitializeStreaming { id: Uuid::new_v4() };
        let frame = encode_frame(&message).unwrap();
        let payload = &frame[12..];

        let as_text = String::from_utf8_lossy(payload);
        assert!(as_text.contains("InitializeStreaming"));
        assert!(as_text.contains("id"));
    }

    #[test]
    fn accumulator_yields_nothing_until_frame_completes() {
        let message = ServiceMessage::InitializationComplete {};
        let frame = encode_frame(&message).unwrap();

        let mut acc = FrameAccumulator::new();
        for byte in &frame[..frame.len() - 1] {
            acc.extend(std::slice::from_ref(byte));
            assert!(acc.next_payload().unwrap().is_none());
        }
        acc.extend(&frame[frame.len() - 1..]);
        let payload = acc.next_payload().unwrap().expect("complete frame");
        assert_eq!(decode_payload::<ServiceMessage>(&payload).unwrap(), message);
    }

    #[test]
    fn accumulator_retains_overshoot_for_next_frame() {
        let first = ServiceMessage::InitializationComplete {};
        let second = ServiceMessage::StatusConnectionOpen {
            max_utilization: 0.5,
            can_overload: true,
        };
        let mut bytes = encode_frame(&first).unwrap();
        bytes.extend_from_slice(&encode_frame(&second).unwrap());

        let mut acc = FrameAccumulator::new();
        acc.extend(&bytes);
        let p1 = acc.next_payload().unwrap().unwrap();
        let p2 = acc.next_payload().unwrap().unwrap();
        assert_eq!(decode_payload::<ServiceMessage>(&p1).unwrap(), first);
        assert_eq!(decode_payload::<ServiceMessage>(&p2).unwrap(), second);
        assert!(acc.next_payload().unwrap().is_none());
    }

    #[test]
    fn magic_mismatch_is_fatal() {
        let mut acc = FrameAccumulator::new();
        acc.extend(&[0xde, 0xad, 0xbe, 0xef]);
        let err = acc.next_payload().unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
