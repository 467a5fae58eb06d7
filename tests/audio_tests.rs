// Integration tests for audio decoding and PCM handling
//
// Ogg/Opus fixtures are synthesized in-process with the same codec the
// decoder uses; WAV fixtures are written with hound.

use std::io::Cursor;

use anyhow::Result;
use audiopus::coder::Encoder as OpusEncoder;
use audiopus::{Application, Channels, SampleRate};
use ogg::writing::{PacketWriteEndInfo, PacketWriter};
use voicescribe::audio::{decode_file, decode_to_pcm, TARGET_CHANNELS, TARGET_SAMPLE_RATE};
use voicescribe::AudioBuffer;

/// 20 ms at 48 kHz, per channel.
const ENCODE_FRAME: usize = 960;

fn opus_head(channels: u8, pre_skip: u16) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(b"OpusHead");
    head.push(1);
    head.push(channels);
    head.extend_from_slice(&pre_skip.to_le_bytes());
    head.extend_from_slice(&48_000u32.to_le_bytes());
    head.extend_from_slice(&0i16.to_le_bytes());
    head.push(0);
    head
}

fn opus_tags() -> Vec<u8> {
    let vendor = b"voicescribe-tests";
    let mut tags = Vec::new();
    tags.extend_from_slice(b"OpusTags");
    tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    tags.extend_from_slice(vendor);
    tags.extend_from_slice(&0u32.to_le_bytes());
    tags
}

/// Build a minimal Ogg Opus file containing `packets` frames of silence.
fn synthesize_ogg_opus(packets: usize) -> Result<Vec<u8>> {
    let mut encoder = OpusEncoder::new(SampleRate::Hz48000, Channels::Stereo, Application::Audio)?;

    let mut out = Vec::new();
    let mut writer = PacketWriter::new(Cursor::new(&mut out));
    let serial = 0x5c21;

    writer.write_packet(opus_head(2, 0), serial, PacketWriteEndInfo::EndPage, 0)?;
    writer.write_packet(opus_tags(), serial, PacketWriteEndInfo::EndPage, 0)?;

    let pcm = vec![0i16; ENCODE_FRAME * 2];
    let mut granule = 0u64;
    for i in 0..packets {
        let mut encoded = vec![0u8; 4000];
        let len = encoder.encode(&pcm, &mut encoded)?;
        encoded.truncate(len);
        granule += ENCODE_FRAME as u64;
        let end = if i == packets - 1 {
            PacketWriteEndInfo::EndStream
        } else {
            PacketWriteEndInfo::NormalPacket
        };
        writer.write_packet(encoded, serial, end, granule)?;
    }
    drop(writer);
    Ok(out)
}

fn write_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

#[test]
fn test_ogg_opus_decodes_to_target_format() -> Result<()> {
    let packets = 25;
    let bytes = synthesize_ogg_opus(packets)?;

    let buffer = decode_to_pcm(&bytes)?;
    assert_eq!(buffer.sample_rate, TARGET_SAMPLE_RATE);
    assert_eq!(buffer.channels, TARGET_CHANNELS);
    assert_eq!(
        buffer.samples.len(),
        packets * ENCODE_FRAME * TARGET_CHANNELS as usize
    );
    Ok(())
}

#[test]
fn test_pre_skip_samples_are_dropped() -> Result<()> {
    let with_skip = {
        let mut encoder =
            OpusEncoder::new(SampleRate::Hz48000, Channels::Stereo, Application::Audio)?;
        let mut out = Vec::new();
        let mut writer = PacketWriter::new(Cursor::new(&mut out));
        let serial = 0x5c22;
        writer.write_packet(opus_head(2, 312), serial, PacketWriteEndInfo::EndPage, 0)?;
        writer.write_packet(opus_tags(), serial, PacketWriteEndInfo::EndPage, 0)?;
        let pcm = vec![0i16; ENCODE_FRAME * 2];
        let mut encoded = vec![0u8; 4000];
        let len = encoder.encode(&pcm, &mut encoded)?;
        encoded.truncate(len);
        writer.write_packet(
            encoded,
            serial,
            PacketWriteEndInfo::EndStream,
            ENCODE_FRAME as u64,
        )?;
        drop(writer);
        out
    };

    let buffer = decode_to_pcm(&with_skip)?;
    assert_eq!(
        buffer.samples.len(),
        (ENCODE_FRAME - 312) * TARGET_CHANNELS as usize
    );
    Ok(())
}

#[test]
fn test_first_packet_must_be_opus_head() -> Result<()> {
    let mut out = Vec::new();
    let mut writer = PacketWriter::new(Cursor::new(&mut out));
    writer.write_packet(
        b"NotOpusAtAll".to_vec(),
        0x5c23,
        PacketWriteEndInfo::EndStream,
        0,
    )?;
    drop(writer);

    assert!(decode_to_pcm(&out).is_err());
    Ok(())
}

#[test]
fn test_wav_decodes_preserving_samples() -> Result<()> {
    let samples: Vec<i16> = (0..2000).map(|i| (i % 256) as i16).collect();
    let bytes = write_wav(&samples, 16_000, 1)?;

    let buffer = decode_to_pcm(&bytes)?;
    assert_eq!(buffer.sample_rate, 16_000);
    assert_eq!(buffer.channels, 1);
    assert_eq!(buffer.samples, samples);
    Ok(())
}

#[test]
fn test_wav_rejects_float_samples() -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 48_000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    writer.write_sample(0.25f32)?;
    writer.finalize()?;

    assert!(decode_to_pcm(&cursor.into_inner()).is_err());
    Ok(())
}

#[test]
fn test_unrecognized_container_rejected() {
    let err = decode_to_pcm(b"definitely not audio").unwrap_err();
    assert!(err.to_string().contains("container"));
}

#[test]
fn test_decode_file_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tone.wav");
    let samples: Vec<i16> = vec![1, -2, 3, -4, 5, -6];
    std::fs::write(&path, write_wav(&samples, 8_000, 1)?)?;

    let buffer = decode_file(&path)?;
    assert_eq!(buffer.samples, samples);
    Ok(())
}

#[test]
fn test_downmix_averages_frames() -> Result<()> {
    let stereo = AudioBuffer::new(vec![100, 200, 300, 400], 48_000, 2)?;
    let mono = stereo.downmix_to_mono();

    assert_eq!(mono.channels, 1);
    assert_eq!(mono.sample_rate, 48_000);
    assert_eq!(mono.samples, vec![150, 350]);
    Ok(())
}

#[test]
fn test_downmix_floors_negative_averages() -> Result<()> {
    let stereo = AudioBuffer::new(vec![-3, -4, 1, -2], 48_000, 2)?;
    let mono = stereo.downmix_to_mono();
    // floor(-3.5) = -4, floor(-0.5) = -1
    assert_eq!(mono.samples, vec![-4, -1]);
    Ok(())
}

#[test]
fn test_downmix_of_mono_is_identity() -> Result<()> {
    let mono = AudioBuffer::new(vec![7, 8, 9], 16_000, 1)?;
    let mixed = mono.downmix_to_mono();
    assert_eq!(mixed.samples, mono.samples);
    assert_eq!(mixed.channels, 1);
    Ok(())
}

#[test]
fn test_chunks_cover_buffer_with_short_tail() -> Result<()> {
    let buffer = AudioBuffer::new(vec![0i16; 1000], 48_000, 2)?;
    let chunks: Vec<&[i16]> = buffer.chunks(240).collect();

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].len(), 480);
    assert_eq!(chunks[1].len(), 480);
    assert_eq!(chunks[2].len(), 40);
    assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 1000);
    Ok(())
}

#[test]
fn test_one_second_of_stereo_is_two_hundred_chunks() -> Result<()> {
    let buffer = AudioBuffer::new(vec![0i16; 48_000 * 2], 48_000, 2)?;
    assert_eq!(buffer.chunks(240).count(), 200);
    assert!((buffer.duration_seconds() - 1.0).abs() < f64::EPSILON);
    Ok(())
}

#[test]
fn test_buffer_rejects_ragged_frames() {
    assert!(AudioBuffer::new(vec![1, 2, 3], 48_000, 2).is_err());
    assert!(AudioBuffer::new(vec![1, 2], 48_000, 0).is_err());
}
