use crate::error::{Error, Result};

/// Interleaved 16-bit PCM audio.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Raw samples, interleaved by channel.
    pub samples: Vec<i16>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo).
    pub channels: u8,
}

impl AudioBuffer {
    /// Build a buffer, enforcing that the sample count divides evenly into
    /// whole frames.
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u8) -> Result<Self> {
        if channels == 0 {
            return Err(Error::AudioDecode("audio has zero channels".into()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(Error::AudioDecode(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Number of per-channel sample frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Split the buffer into transmission chunks of `per_channel` samples
    /// per channel (`per_channel * channels` interleaved samples). The last
    /// chunk may be shorter.
    pub fn chunks(&self, per_channel: usize) -> impl Iterator<Item = &[i16]> {
        self.samples.chunks(per_channel * self.channels as usize)
    }

    /// Mix all channels of each frame down to one, taking the integer floor
    /// of the arithmetic mean. Returns a clone for mono input.
    pub fn downmix_to_mono(&self) -> AudioBuffer {
        if self.channels == 1 {
            return self.clone();
        }
        let channels = self.channels as usize;
        let mixed = self
            .samples
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                sum.div_euclid(channels as i32) as i16
            })
            .collect();
        AudioBuffer {
            samples: mixed,
            sample_rate: self.sample_rate,
            channels: 1,
        }
    }
}
