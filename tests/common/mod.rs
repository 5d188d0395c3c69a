//! Shared helpers for integration tests.
//!
//! The speech model is replaced by a scripted stand-in so the pipeline can run
//! without Python or Bark installed.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use beatbrains::audio::AudioClip;
use beatbrains::codec::write_mp3;
use beatbrains::config::{PipelineConfig, SynthesisConfig};
use beatbrains::pipeline::SongPipeline;
use beatbrains::tts::{
    EngineInfo, SamplingParams, SpeechModel, SpeechModelService, TtsError, VoiceSynthesizer,
};

pub const MODEL_RATE: u32 = 16_000;

/// Produces `secs_per_call` seconds of tone per call and fails on any prompt
/// containing one of `fail_on`.
pub struct ScriptedModel {
    pub secs_per_call: f32,
    pub fail_on: Vec<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(secs_per_call: f32) -> Self {
        Self {
            secs_per_call,
            fail_on: Vec::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on.push(needle.to_string());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl SpeechModel for ScriptedModel {
    fn preload(&self) -> Result<(), TtsError> {
        Ok(())
    }

    fn generate(
        &self,
        prompt: &str,
        _voice_preset: &str,
        _params: &SamplingParams,
    ) -> Result<Vec<f32>, TtsError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail_on.iter().any(|needle| prompt.contains(needle.as_str())) {
            return Err(TtsError::ModelError(format!("scripted failure: {prompt}")));
        }
        let len = (self.secs_per_call * MODEL_RATE as f32) as usize;
        Ok(tone_samples(len, MODEL_RATE, 330.0, 0.4))
    }

    fn sample_rate(&self) -> u32 {
        MODEL_RATE
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: "scripted".to_string(),
            version: "0".to_string(),
            sample_rate: MODEL_RATE,
        }
    }
}

pub fn tone_samples(len: usize, sample_rate: u32, freq: f32, amp: f32) -> Vec<f32> {
    (0..len)
        .map(|i| (i as f32 * freq * std::f32::consts::TAU / sample_rate as f32).sin() * amp)
        .collect()
}

/// Stereo tone clip
pub fn tone_clip(secs: f32, sample_rate: u32, channels: u16) -> AudioClip {
    let frames = (secs * sample_rate as f32) as usize;
    let mono = tone_samples(frames, sample_rate, 220.0, 0.5);
    let samples = mono
        .iter()
        .flat_map(|&s| std::iter::repeat(s).take(channels as usize))
        .collect();
    AudioClip::new(samples, sample_rate, channels)
}

/// Write `<dir>/<mood>.mp3` holding `secs` of tone
pub fn write_instrumental(dir: &Path, mood: &str, secs: f32) {
    std::fs::create_dir_all(dir).unwrap();
    write_mp3(dir.join(format!("{mood}.mp3")), &tone_clip(secs, 44100, 2)).unwrap();
}

pub fn ready_service(model: Arc<ScriptedModel>) -> Arc<SpeechModelService> {
    let service = Arc::new(SpeechModelService::new(model));
    service.initialize().unwrap();
    service
}

pub fn synthesizer(model: Arc<ScriptedModel>) -> VoiceSynthesizer {
    VoiceSynthesizer::new(ready_service(model), SynthesisConfig::default()).unwrap()
}

pub fn pipeline(model: Arc<ScriptedModel>, output_dir: &Path, assets_dir: &Path) -> SongPipeline {
    SongPipeline::new(
        synthesizer(model),
        PipelineConfig {
            output_dir: output_dir.to_path_buf(),
            assets_dir: assets_dir.to_path_buf(),
            ..Default::default()
        },
    )
}
