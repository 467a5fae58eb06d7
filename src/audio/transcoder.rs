use std::io::Cursor;
use std::path::Path;

use audiopus::{coder::Decoder as OpusDecoder, Channels, SampleRate};
use hound::WavReader;
use ogg::PacketReader;
use tracing::{debug, info};

use crate::audio::AudioBuffer;
use crate::error::{Error, Result};

/// Native sample rate of platform voice messages; Opus always decodes to it.
pub const TARGET_SAMPLE_RATE: u32 = 48_000;
/// Voice messages are stereo; the Opus path always produces two channels.
pub const TARGET_CHANNELS: u8 = 2;

/// Largest possible Opus frame: 120 ms at 48 kHz, per channel.
const MAX_FRAME_SAMPLES: usize = 5760;

/// Decode compressed audio into PCM suitable for streaming.
///
/// The container is sniffed from the leading bytes: `OggS` selects the
/// Opus voice-message path, `RIFF` the WAV path used by local test files.
pub fn decode_to_pcm(bytes: &[u8]) -> Result<AudioBuffer> {
    match bytes {
        [b'O', b'g', b'g', b'S', ..] => decode_ogg_opus(bytes),
        [b'R', b'I', b'F', b'F', ..] => decode_wav(bytes),
        _ => Err(Error::AudioDecode(
            "unrecognized audio container (expected Ogg or RIFF)".into(),
        )),
    }
}

/// Read a file and decode it with [`decode_to_pcm`].
pub fn decode_file(path: impl AsRef<Path>) -> Result<AudioBuffer> {
    let path = path.as_ref();
    debug!("decoding audio file: {}", path.display());
    let bytes = std::fs::read(path)?;
    decode_to_pcm(&bytes)
}

/// Identification header of an Ogg Opus stream (RFC 7845 §5.1).
struct OpusHead {
    channels: u8,
    pre_skip: u16,
}

impl OpusHead {
    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 19 || &data[..8] != b"OpusHead" {
            return Err(Error::AudioDecode(
                "first Ogg packet is not an OpusHead header".into(),
            ));
        }
        if data[8] != 1 {
            return Err(Error::AudioDecode(format!(
                "unsupported OpusHead version {}",
                data[8]
            )));
        }
        let channels = data[9];
        if channels == 0 || channels > 2 {
            return Err(Error::AudioDecode(format!(
                "unsupported channel count {channels}"
            )));
        }
        let pre_skip = u16::from_le_bytes([data[10], data[11]]);
        Ok(Self { channels, pre_skip })
    }
}

fn decode_ogg_opus(bytes: &[u8]) -> Result<AudioBuffer> {
    let mut reader = PacketReader::new(Cursor::new(bytes));

    let head_packet = reader.read_packet_expected()?;
    let head = OpusHead::parse(&head_packet.data)?;
    // Second packet is the OpusTags comment header; nothing in it matters here.
    let _tags = reader.read_packet_expected()?;

    let mut decoder = OpusDecoder::new(SampleRate::Hz48000, Channels::Stereo)?;
    let mut frame = vec![0i16; MAX_FRAME_SAMPLES * TARGET_CHANNELS as usize];
    let mut pcm: Vec<i16> = Vec::new();
    let mut packets = 0usize;

    while let Some(packet) = reader.read_packet()? {
        if packet.data.is_empty() {
            continue;
        }
        let decoded = decoder.decode(Some(&packet.data[..]), &mut frame[..], false)?;
        pcm.extend_from_slice(&frame[..decoded * TARGET_CHANNELS as usize]);
        packets += 1;
    }

    // Drop the encoder priming samples declared in the header.
    let skip = head.pre_skip as usize * TARGET_CHANNELS as usize;
    let samples = if skip < pcm.len() {
        pcm.split_off(skip)
    } else {
        Vec::new()
    };

    let buffer = AudioBuffer::new(samples, TARGET_SAMPLE_RATE, TARGET_CHANNELS)?;
    info!(
        "decoded Ogg/Opus: {} packets, {} source channels, {:.2}s at {} Hz",
        packets,
        head.channels,
        buffer.duration_seconds(),
        buffer.sample_rate
    );
    Ok(buffer)
}

fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(Error::AudioDecode(format!(
            "expected 16-bit integer WAV, got {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }
    if spec.channels == 0 || spec.channels > u8::MAX as u16 {
        return Err(Error::AudioDecode(format!(
            "unsupported WAV channel count {}",
            spec.channels
        )));
    }

    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let buffer = AudioBuffer::new(samples, spec.sample_rate, spec.channels as u8)?;
    info!(
        "decoded WAV: {:.2}s, {} Hz, {} channels",
        buffer.duration_seconds(),
        buffer.sample_rate,
        buffer.channels
    );
    Ok(buffer)
}
