//! Audio containers and WAV I/O
//!
//! - [`SampleBuffer`]: mono float samples straight from the speech model
//! - [`Waveform`]: the assembled, 16-bit vocal track
//! - [`AudioClip`]: interleaved float audio used while mixing

use std::path::Path;

use thiserror::Error;

/// Errors raised while reading, converting or writing audio
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Resample error: {0}")]
    Resample(String),

    #[error("Sample rate mismatch: expected {expected} Hz, got {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    #[error("Unsupported audio layout: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Convert a gain in decibels to a linear amplitude factor
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Mono float samples at a known sample rate
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// `secs` seconds of digital silence
    pub fn silence(secs: f32, sample_rate: u32) -> Self {
        let len = (secs * sample_rate as f32).round() as usize;
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }
}

/// The assembled vocal track: mono, 16-bit
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// True when every sample is zero
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0)
    }

    /// Write as a 16-bit mono WAV file
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &s in &self.samples {
            writer.write_sample(s)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Read a 16-bit mono WAV file written by [`Waveform::write_wav`]
    pub fn read_wav(path: impl AsRef<Path>) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        if spec.channels != 1
            || spec.bits_per_sample != 16
            || spec.sample_format != hound::SampleFormat::Int
        {
            return Err(AudioError::Unsupported(format!(
                "expected 16-bit mono PCM, got {} channel(s) {}-bit {:?}",
                spec.channels, spec.bits_per_sample, spec.sample_format
            )));
        }
        let samples = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(samples, spec.sample_rate))
    }

    /// Float view of the waveform for mixing
    pub fn to_clip(&self) -> AudioClip {
        let samples = self
            .samples
            .iter()
            .map(|&s| s as f32 / 32768.0)
            .collect();
        AudioClip::new(samples, self.sample_rate, 1)
    }
}

/// Interleaved float audio
#[derive(Clone, Debug, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }

    /// Multiply every sample by `gain_db` decibels
    pub fn apply_gain_db(&mut self, gain_db: f32) {
        let gain = db_to_gain(gain_db);
        for s in self.samples.iter_mut() {
            *s *= gain;
        }
    }

    /// Duplicate mono material to `channels` channels, or fold surround
    /// material down to stereo
    pub fn with_channels(self, channels: u16) -> Result<Self> {
        if channels == self.channels {
            return Ok(self);
        }
        if channels == 2 && self.channels > 2 {
            return Ok(self.downmix_stereo());
        }
        if self.channels != 1 {
            return Err(AudioError::Unsupported(format!(
                "cannot convert {} channels to {}",
                self.channels, channels
            )));
        }
        let mut samples = Vec::with_capacity(self.samples.len() * channels as usize);
        for &s in &self.samples {
            for _ in 0..channels {
                samples.push(s);
            }
        }
        Ok(Self::new(samples, self.sample_rate, channels))
    }

    /// Keep the first two channels as left and right and spread the mean of
    /// the remaining channels over both at half gain.
    fn downmix_stereo(self) -> Self {
        let channels = self.channels as usize;
        let extra = (channels - 2) as f32;
        let mut samples = Vec::with_capacity(self.frames() * 2);
        for frame in self.samples.chunks_exact(channels) {
            let rest = frame[2..].iter().sum::<f32>() / extra * 0.5;
            samples.push(frame[0] + rest);
            samples.push(frame[1] + rest);
        }
        Self::new(samples, self.sample_rate, 2)
    }

    /// Pad with silence or cut so the clip is exactly `frames` long
    pub fn set_frames(&mut self, frames: usize) {
        self.samples.resize(frames * self.channels as usize, 0.0);
    }

    /// Scale so the peak sits at `target_peak` (no-op for silence)
    pub fn normalize_peak(&mut self, target_peak: f32) {
        let max_abs = self.peak();
        if max_abs > 0.0 {
            let scale = target_peak / max_abs;
            for s in self.samples.iter_mut() {
                *s *= scale;
            }
        }
    }
}

/// Largest absolute value in `samples`
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}
