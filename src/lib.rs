pub mod assembler;
pub mod audio;
pub mod chunker;
pub mod cli_style;
pub mod codec;
pub mod config;
pub mod mixer;
pub mod normalization;
pub mod pipeline;
pub mod protocol;
pub mod python_backend;
pub mod resample;
pub mod server;
pub mod splitter;
pub mod tts;

pub use audio::{AudioClip, AudioError, SampleBuffer, Waveform};
pub use chunker::{chunk, TextSegment};
pub use config::{Cli, Commands, GenerateArgs, PipelineConfig, ServeArgs};
pub use mixer::{MixReport, Mixer};
pub use pipeline::{PipelineError, SongOutcome, SongPipeline, SynthesisMode};
pub use protocol::Mood;
pub use server::AppState;
pub use tts::{
    EngineInfo, SamplingParams, SpeechModel, SpeechModelService, TtsError, VoiceSynthesizer,
};
