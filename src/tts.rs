//! Voice synthesis for sung segments
//!
//! Wraps a [`SpeechModel`] (Bark in production) behind a small adapter that
//! frames every segment as a singing prompt and never lets one bad segment
//! sink a whole song: failures turn into a fixed stretch of silence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::audio::SampleBuffer;
use crate::chunker::{preview, TextSegment};
use crate::config::SynthesisConfig;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during synthesis
#[derive(Error, Debug, Clone)]
pub enum TtsError {
    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Speech model is not initialized")]
    NotReady,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Worker error: {0}")]
    WorkerError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for TtsError {
    fn from(err: std::io::Error) -> Self {
        TtsError::IoError(err.to_string())
    }
}

// =============================================================================
// Model boundary
// =============================================================================

/// Sampling temperatures for the two Bark stages
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingParams {
    pub text_temp: f32,
    pub waveform_temp: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            text_temp: 0.7,
            waveform_temp: 0.7,
        }
    }
}

impl From<&SynthesisConfig> for SamplingParams {
    fn from(config: &SynthesisConfig) -> Self {
        Self {
            text_temp: config.text_temp,
            waveform_temp: config.waveform_temp,
        }
    }
}

/// Engine information
#[derive(Clone, Debug, PartialEq)]
pub struct EngineInfo {
    pub name: String,
    pub version: String,
    pub sample_rate: u32,
}

/// A pretrained text-to-audio model.
///
/// Calls are blocking; the server runs them on a blocking thread.
pub trait SpeechModel: Send + Sync {
    /// Load weights. Called once before any `generate`.
    fn preload(&self) -> Result<(), TtsError>;

    /// Generate mono float samples at [`SpeechModel::sample_rate`]
    fn generate(
        &self,
        prompt: &str,
        voice_preset: &str,
        params: &SamplingParams,
    ) -> Result<Vec<f32>, TtsError>;

    /// Output sample rate
    fn sample_rate(&self) -> u32;

    /// Get engine information
    fn info(&self) -> EngineInfo;
}

/// Process-wide handle to the speech model
///
/// Created once at startup and shared through `Arc`. `initialize` preloads
/// the model; nothing may synthesize until it has succeeded.
pub struct SpeechModelService {
    model: Arc<dyn SpeechModel>,
    ready: AtomicBool,
}

impl SpeechModelService {
    pub fn new(model: Arc<dyn SpeechModel>) -> Self {
        Self {
            model,
            ready: AtomicBool::new(false),
        }
    }

    /// Preload the model. Repeated calls after success are no-ops.
    pub fn initialize(&self) -> Result<(), TtsError> {
        if self.is_ready() {
            return Ok(());
        }
        let start = Instant::now();
        info!("Preloading speech model");
        self.model.preload()?;
        self.ready.store(true, Ordering::Release);
        let info = self.model.info();
        info!(
            name = %info.name,
            sample_rate = info.sample_rate,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Speech model ready"
        );
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn model(&self) -> &Arc<dyn SpeechModel> {
        &self.model
    }

    pub fn info(&self) -> EngineInfo {
        self.model.info()
    }
}

// =============================================================================
// Synthesizer
// =============================================================================

/// Frame text as a sung line
pub fn singing_prompt(text: &str) -> String {
    format!("♪ {} ♪", text)
}

/// Output of a batch run
#[derive(Clone, Debug, PartialEq)]
pub struct BatchSynthesis {
    /// One buffer per input segment, in order
    pub buffers: Vec<SampleBuffer>,
    /// Indices of segments replaced by silence
    pub silenced: Vec<usize>,
}

/// Turns text segments into sample buffers
pub struct VoiceSynthesizer {
    service: Arc<SpeechModelService>,
    config: SynthesisConfig,
}

impl VoiceSynthesizer {
    /// Build an adapter over an initialized model service.
    pub fn new(service: Arc<SpeechModelService>, config: SynthesisConfig) -> Result<Self, TtsError> {
        if !service.is_ready() {
            return Err(TtsError::NotReady);
        }
        Ok(Self { service, config })
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.service.model().sample_rate()
    }

    pub fn params(&self) -> SamplingParams {
        SamplingParams::from(&self.config)
    }

    /// One model call for `text`, errors propagated
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub fn try_synthesize(&self, text: &str) -> Result<SampleBuffer, TtsError> {
        let start = Instant::now();
        let prompt = singing_prompt(text);
        debug!(prompt = %prompt, "Synthesizing");

        let samples = self.service.model().generate(
            &prompt,
            &self.config.voice_preset,
            &self.params(),
        )?;
        if samples.is_empty() {
            return Err(TtsError::ModelError("model returned no audio".to_string()));
        }

        let buffer = SampleBuffer::new(samples, self.sample_rate());
        debug!(
            samples = buffer.len(),
            duration_secs = format!("{:.2}", buffer.duration_secs()),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Segment synthesized"
        );
        Ok(buffer)
    }

    /// Silence substituted for a failed segment
    pub fn failure_silence(&self) -> SampleBuffer {
        SampleBuffer::silence(self.config.silence_on_failure_secs, self.sample_rate())
    }

    /// Synthesize one segment; a failure yields silence instead of an error.
    pub fn synthesize(&self, segment: &TextSegment) -> SampleBuffer {
        self.synthesize_or_silence(segment).0
    }

    fn synthesize_or_silence(&self, segment: &TextSegment) -> (SampleBuffer, bool) {
        match self.try_synthesize(&segment.text) {
            Ok(buffer) => (buffer, false),
            Err(e) => {
                warn!(
                    index = segment.index,
                    text = preview(&segment.text, 40),
                    error = %e,
                    "Segment synthesis failed, substituting silence"
                );
                (self.failure_silence(), true)
            }
        }
    }

    /// Synthesize segments in order, one buffer each.
    pub fn synthesize_batch(&self, segments: &[TextSegment]) -> BatchSynthesis {
        let mut buffers = Vec::with_capacity(segments.len());
        let mut silenced = Vec::new();

        for segment in segments {
            info!(
                index = segment.index,
                total = segments.len(),
                "Generating segment"
            );
            let (buffer, failed) = self.synthesize_or_silence(segment);
            if failed {
                silenced.push(segment.index);
            }
            buffers.push(buffer);
        }

        BatchSynthesis { buffers, silenced }
    }

    /// Short input: one call on the raw text, no chunking.
    ///
    /// There is no other audio to fall back on, so errors propagate.
    pub fn synthesize_fast(&self, text: &str) -> Result<SampleBuffer, TtsError> {
        self.try_synthesize(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns 0.1 s of a constant per call; fails on prompts containing "fail"
    struct MockModel {
        prompts: Mutex<Vec<String>>,
        preloads: Mutex<usize>,
        fail_preload: bool,
    }

    impl MockModel {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                preloads: Mutex::new(0),
                fail_preload: false,
            }
        }
    }

    impl SpeechModel for MockModel {
        fn preload(&self) -> Result<(), TtsError> {
            *self.preloads.lock().unwrap() += 1;
            if self.fail_preload {
                return Err(TtsError::ModelError("weights missing".into()));
            }
            Ok(())
        }

        fn generate(
            &self,
            prompt: &str,
            voice_preset: &str,
            params: &SamplingParams,
        ) -> Result<Vec<f32>, TtsError> {
            assert_eq!(voice_preset, "v2/en_speaker_6");
            assert_eq!(*params, SamplingParams::default());
            self.prompts.lock().unwrap().push(prompt.to_string());
            if prompt.contains("fail") {
                return Err(TtsError::ModelError("boom".into()));
            }
            Ok(vec![0.25; 2400])
        }

        fn sample_rate(&self) -> u32 {
            24000
        }

        fn info(&self) -> EngineInfo {
            EngineInfo {
                name: "mock".into(),
                version: "0".into(),
                sample_rate: 24000,
            }
        }
    }

    fn ready_synthesizer() -> (Arc<MockModel>, VoiceSynthesizer) {
        let model = Arc::new(MockModel::new());
        let service = Arc::new(SpeechModelService::new(model.clone()));
        service.initialize().unwrap();
        let synth = VoiceSynthesizer::new(service, SynthesisConfig::default()).unwrap();
        (model, synth)
    }

    #[test]
    fn test_singing_prompt() {
        assert_eq!(singing_prompt("la la"), "♪ la la ♪");
    }

    #[test]
    fn test_adapter_requires_ready_service() {
        let service = Arc::new(SpeechModelService::new(Arc::new(MockModel::new())));
        assert!(matches!(
            VoiceSynthesizer::new(service, SynthesisConfig::default()),
            Err(TtsError::NotReady)
        ));
    }

    #[test]
    fn test_initialize_once() {
        let model = Arc::new(MockModel::new());
        let service = SpeechModelService::new(model.clone());
        service.initialize().unwrap();
        service.initialize().unwrap();
        assert!(service.is_ready());
        assert_eq!(*model.preloads.lock().unwrap(), 1);
    }

    #[test]
    fn test_initialize_failure_leaves_not_ready() {
        let model = Arc::new(MockModel {
            fail_preload: true,
            ..MockModel::new()
        });
        let service = SpeechModelService::new(model);
        assert!(service.initialize().is_err());
        assert!(!service.is_ready());
    }

    #[test]
    fn test_synthesize_frames_prompt() {
        let (model, synth) = ready_synthesizer();
        let buffer = synth.synthesize(&TextSegment::new(0, "Hello there."));
        assert_eq!(buffer.len(), 2400);
        assert_eq!(buffer.sample_rate, 24000);
        assert_eq!(model.prompts.lock().unwrap()[0], "♪ Hello there. ♪");
    }

    #[test]
    fn test_failed_segment_becomes_silence() {
        let (_, synth) = ready_synthesizer();
        let buffer = synth.synthesize(&TextSegment::new(1, "this will fail"));
        assert_eq!(buffer.len(), 48000);
        assert_eq!(buffer.peak(), 0.0);
    }

    #[test]
    fn test_batch_keeps_order_and_counts_failures() {
        let (_, synth) = ready_synthesizer();
        let segments = vec![
            TextSegment::new(0, "first line."),
            TextSegment::new(1, "fail here."),
            TextSegment::new(2, "third line."),
        ];
        let batch = synth.synthesize_batch(&segments);
        assert_eq!(batch.buffers.len(), 3);
        assert_eq!(batch.silenced, vec![1]);
        assert_eq!(batch.buffers[0].len(), 2400);
        assert_eq!(batch.buffers[1].len(), 48000);
        assert_eq!(batch.buffers[2].len(), 2400);
    }

    #[test]
    fn test_fast_path_propagates_errors() {
        let (_, synth) = ready_synthesizer();
        assert!(synth.synthesize_fast("please fail").is_err());
        assert_eq!(synth.synthesize_fast("hi").unwrap().len(), 2400);
    }

    #[test]
    fn test_sampling_params_from_config() {
        let config = SynthesisConfig {
            text_temp: 0.5,
            waveform_temp: 0.9,
            ..Default::default()
        };
        let params = SamplingParams::from(&config);
        assert_eq!(params.text_temp, 0.5);
        assert_eq!(params.waveform_temp, 0.9);
    }
}
