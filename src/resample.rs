//! Sample-rate conversion using rubato
//!
//! Only used to bring the vocal and the instrumental to a common rate before
//! overlay, so a cubic polynomial resampler is plenty.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use crate::audio::{AudioClip, AudioError, Result};

const CHUNK_SIZE: usize = 1024;

/// Frames a clip of `frames` frames has after conversion to `target_rate`
pub fn resampled_frames(frames: usize, from_rate: u32, target_rate: u32) -> usize {
    ((frames as f64) * target_rate as f64 / from_rate as f64).round() as usize
}

/// Resample an interleaved clip to `target_rate`.
///
/// The result has exactly [`resampled_frames`] frames: the resampler delay is
/// dropped from the front and the tail is padded or cut as needed.
pub fn resample(clip: &AudioClip, target_rate: u32) -> Result<AudioClip> {
    if clip.sample_rate == target_rate || clip.is_empty() {
        return Ok(AudioClip::new(
            clip.samples.clone(),
            target_rate,
            clip.channels,
        ));
    }

    let channels = clip.channels.max(1) as usize;
    let ratio = target_rate as f64 / clip.sample_rate as f64;
    let expected = resampled_frames(clip.frames(), clip.sample_rate, target_rate);

    let mut resampler =
        FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Cubic, CHUNK_SIZE, channels)
            .map_err(|e| AudioError::Resample(format!("failed to create resampler: {e}")))?;
    let delay = resampler.output_delay();

    let planar = deinterleave(&clip.samples, channels);
    let frames = clip.frames();

    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels];
    let mut pos = 0;

    // Keep feeding (zero padding past the end) until the delayed tail is out.
    while output[0].len() < expected + delay {
        let input: Vec<Vec<f32>> = planar
            .iter()
            .map(|channel| {
                let mut chunk = vec![0.0f32; CHUNK_SIZE];
                if pos < frames {
                    let end = (pos + CHUNK_SIZE).min(frames);
                    chunk[..end - pos].copy_from_slice(&channel[pos..end]);
                }
                chunk
            })
            .collect();

        let result = resampler
            .process(&input, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        for (out, channel) in output.iter_mut().zip(result) {
            out.extend_from_slice(&channel);
        }
        pos += CHUNK_SIZE;
    }

    let trimmed: Vec<Vec<f32>> = output
        .into_iter()
        .map(|channel| channel[delay..delay + expected].to_vec())
        .collect();

    Ok(AudioClip::new(
        interleave(&trimmed),
        target_rate,
        clip.channels,
    ))
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let mut planar = vec![Vec::with_capacity(samples.len() / channels); channels];
    for frame in samples.chunks_exact(channels) {
        for (ch, &s) in frame.iter().enumerate() {
            planar[ch].push(s);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.first().map(Vec::len).unwrap_or(0);
    let mut samples = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        for channel in planar {
            samples.push(channel[i]);
        }
    }
    samples
}
