//! Vocal assembly: concatenate, peak-normalize, quantize
//!
//! Per-segment buffers are joined in order, scaled so the loudest sample sits
//! at 90% of full scale, then truncated to 16-bit integers.

use tracing::{debug, info, warn};

use crate::audio::{peak, AudioError, SampleBuffer, Waveform};

/// Target peak as a fraction of full scale
pub const PEAK_CEILING: f32 = 0.9;

/// Full-scale multiplier for 16-bit quantization
const I16_SCALE: f32 = 32767.0;

/// Concatenate multiple sample buffers
fn concatenate_audio(buffers: &[SampleBuffer]) -> Vec<f32> {
    let total_len = buffers.iter().map(SampleBuffer::len).sum();
    let mut result = Vec::with_capacity(total_len);
    for buffer in buffers {
        result.extend_from_slice(&buffer.samples);
    }
    result
}

/// Scale so the peak equals `ceiling`; silence is left untouched
fn normalize_audio(mut audio: Vec<f32>, ceiling: f32) -> Vec<f32> {
    let max_abs = peak(&audio);
    if max_abs > 0.0 {
        let scale = ceiling / max_abs;
        for s in audio.iter_mut() {
            *s *= scale;
        }
    }
    audio
}

/// Quantize by `x * 32767`, truncating toward zero
fn quantize(audio: &[f32]) -> Vec<i16> {
    audio.iter().map(|&s| (s * I16_SCALE) as i16).collect()
}

/// Assemble ordered buffers into one vocal waveform.
///
/// All buffers must share a sample rate. An empty input or an all-silent
/// result is returned as-is; callers decide how to treat a silent take.
pub fn assemble(buffers: &[SampleBuffer]) -> Result<Waveform, AudioError> {
    let sample_rate = match buffers.first() {
        Some(first) => first.sample_rate,
        None => {
            return Err(AudioError::Unsupported(
                "no sample buffers to assemble".to_string(),
            ))
        }
    };

    if let Some(other) = buffers.iter().find(|b| b.sample_rate != sample_rate) {
        return Err(AudioError::SampleRateMismatch {
            expected: sample_rate,
            actual: other.sample_rate,
        });
    }

    debug!(buffers = buffers.len(), "combining audio chunks");
    let audio = concatenate_audio(buffers);
    let audio = normalize_audio(audio, PEAK_CEILING);
    let waveform = Waveform::new(quantize(&audio), sample_rate);

    if waveform.is_silent() {
        warn!(
            samples = waveform.len(),
            "assembled vocal is completely silent"
        );
    }
    info!(
        duration_secs = format!("{:.1}", waveform.duration_secs()),
        samples = waveform.len(),
        "vocal waveform assembled"
    );

    Ok(waveform)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenate_audio() {
        let buffers = vec![
            SampleBuffer::new(vec![1.0, 2.0, 3.0], 10),
            SampleBuffer::new(vec![4.0, 5.0], 10),
            SampleBuffer::new(vec![6.0], 10),
        ];
        assert_eq!(
            concatenate_audio(&buffers),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }

    #[test]
    fn test_normalize_audio_to_ceiling() {
        let audio = normalize_audio(vec![0.2, -0.4, 0.1], 0.9);
        assert!((audio[1] + 0.9).abs() < 1e-6);
        assert!((audio[0] - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_quantize_truncates() {
        assert_eq!(quantize(&[0.9, -0.9, 0.0, 1.0]), vec![29490, -29490, 0, 32767]);
        // 0.5 * 32767 = 16383.5 truncates toward zero
        assert_eq!(quantize(&[0.5, -0.5]), vec![16383, -16383]);
    }

    #[test]
    fn test_assemble_duration_is_sum() {
        let buffers = vec![
            SampleBuffer::new(vec![0.1; 2400], 24000),
            SampleBuffer::silence(2.0, 24000),
            SampleBuffer::new(vec![-0.3; 1200], 24000),
        ];
        let waveform = assemble(&buffers).unwrap();
        assert_eq!(waveform.len(), 2400 + 48000 + 1200);
        assert!((waveform.duration_secs() - 2.15).abs() < 1e-4);
    }

    #[test]
    fn test_assemble_peak_ceiling() {
        let buffers = vec![SampleBuffer::new(vec![0.01, -0.02, 0.015], 24000)];
        let waveform = assemble(&buffers).unwrap();
        let max = waveform.samples.iter().map(|s| s.unsigned_abs()).max().unwrap();
        assert!(max as f32 <= PEAK_CEILING * I16_SCALE);
        assert_eq!(max, 29490);
    }

    #[test]
    fn test_assemble_preserves_silence_window() {
        let buffers = vec![
            SampleBuffer::new(vec![0.5; 10], 100),
            SampleBuffer::silence(2.0, 100),
            SampleBuffer::new(vec![0.25; 10], 100),
        ];
        let waveform = assemble(&buffers).unwrap();
        assert!(waveform.samples[10..210].iter().all(|&s| s == 0));
        assert_eq!(waveform.samples[0], 29490);
        assert_eq!(waveform.samples[210], 14745);
    }

    #[test]
    fn test_assemble_all_silent_is_not_rescaled() {
        let buffers = vec![SampleBuffer::silence(0.5, 24000)];
        let waveform = assemble(&buffers).unwrap();
        assert!(waveform.is_silent());
        assert_eq!(waveform.len(), 12000);
    }

    #[test]
    fn test_assemble_empty_buffers() {
        let buffers = vec![SampleBuffer::new(Vec::new(), 24000)];
        let waveform = assemble(&buffers).unwrap();
        assert!(waveform.is_empty());
        assert!(assemble(&[]).is_err());
    }

    #[test]
    fn test_assemble_rejects_mixed_rates() {
        let buffers = vec![
            SampleBuffer::new(vec![0.1], 24000),
            SampleBuffer::new(vec![0.1], 16000),
        ];
        assert!(matches!(
            assemble(&buffers),
            Err(AudioError::SampleRateMismatch {
                expected: 24000,
                actual: 16000
            })
        ));
    }
}
