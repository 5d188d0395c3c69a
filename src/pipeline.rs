//! End-to-end song generation
//!
//! `SongPipeline::generate` is the synchronous unit of work behind one
//! request: validate, synthesize (fast or chunked), assemble the vocal, write
//! it to a temporary WAV, mix it over the mood's instrumental and export the
//! MP3. The temporary WAV is removed whether or not the run succeeds.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::assembler::assemble;
use crate::audio::{AudioError, SampleBuffer};
use crate::chunker::{chunk_with_config, preview};
use crate::config::PipelineConfig;
use crate::mixer::Mixer;
use crate::protocol::Mood;
use crate::tts::{TtsError, VoiceSynthesizer};

/// Message returned to callers for invalid text
pub const INVALID_TEXT_MESSAGE: &str = "Text required (max 500 chars)";

/// Errors that end a song request
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] TtsError),

    #[error("Audio processing failed: {0}")]
    Audio(#[from] AudioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the vocal was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisMode {
    /// Raw text in a single model call
    Fast,
    /// Chunked text, one call per segment
    Chunked,
}

impl SynthesisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisMode::Fast => "fast",
            SynthesisMode::Chunked => "chunked",
        }
    }
}

impl fmt::Display for SynthesisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct SongOutcome {
    /// File name inside the output directory
    pub file_name: String,
    pub path: PathBuf,
    pub duration_secs: f32,
    pub mode: SynthesisMode,
    pub mood: Mood,
    /// Number of synthesis calls made
    pub segments: usize,
    /// Indices of segments replaced by silence
    pub silenced_segments: Vec<usize>,
    pub instrumental_used: bool,
    /// True when the assembled vocal has no signal at all
    pub vocal_silent: bool,
}

impl SongOutcome {
    /// Human-readable notes on every fallback that shaped the song
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.silenced_segments.is_empty() {
            warnings.push(format!(
                "{} of {} segment(s) could not be sung and were replaced by silence",
                self.silenced_segments.len(),
                self.segments
            ));
        }
        if self.vocal_silent {
            warnings.push("vocal track is silent".to_string());
        }
        if !self.instrumental_used {
            warnings.push(format!(
                "no instrumental available for mood '{}', vocals exported alone",
                self.mood
            ));
        }
        warnings
    }

    pub fn degraded(&self) -> bool {
        !self.silenced_segments.is_empty() || self.vocal_silent || !self.instrumental_used
    }

    /// Public URL path of the song
    pub fn song_url(&self) -> String {
        format!("/output/{}", self.file_name)
    }
}

/// Request-unique name stem: `<unix_millis>_<8 hex chars>`
pub fn unique_stamp() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let id = Uuid::new_v4().simple().to_string();
    format!("{}_{}", millis, &id[..8])
}

/// Removes the wrapped path when dropped
struct TempFile(PathBuf);

impl TempFile {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => debug!(path = %self.0.display(), "removed temporary vocal"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.0.display(), error = %e, "failed to remove temporary vocal"),
        }
    }
}

/// Text-to-song pipeline
pub struct SongPipeline {
    synthesizer: VoiceSynthesizer,
    mixer: Mixer,
    config: PipelineConfig,
}

impl SongPipeline {
    pub fn new(synthesizer: VoiceSynthesizer, config: PipelineConfig) -> Self {
        let mixer = Mixer::new(config.assets_dir.clone());
        Self {
            synthesizer,
            mixer,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    /// Reject empty, blank or over-long text.
    pub fn validate(&self, text: &str) -> Result<(), PipelineError> {
        if text.trim().is_empty() || text.chars().count() > self.config.max_text_chars {
            return Err(PipelineError::InvalidInput(INVALID_TEXT_MESSAGE.to_string()));
        }
        Ok(())
    }

    /// Pick the synthesis mode for `text`
    pub fn mode_for(&self, text: &str) -> SynthesisMode {
        if text.chars().count() < self.config.fast_path_chars {
            SynthesisMode::Fast
        } else {
            SynthesisMode::Chunked
        }
    }

    /// Generate one song. Blocks for the whole run.
    #[instrument(skip_all, fields(text_len = text.chars().count(), mood = %mood))]
    pub fn generate(&self, text: &str, mood: Mood) -> Result<SongOutcome, PipelineError> {
        self.validate(text)?;
        let start = Instant::now();
        let mode = self.mode_for(text);
        info!(mode = %mode, text = preview(text, 100), "New song request");

        let (buffers, silenced) = self.synthesize(text, mode)?;
        let segments = buffers.len();

        let waveform = assemble(&buffers)?;

        std::fs::create_dir_all(&self.config.output_dir)?;
        let stamp = unique_stamp();
        let vocal = TempFile(self.config.output_dir.join(format!("vocal_{stamp}.wav")));
        waveform.write_wav(vocal.path())?;

        let file_name = format!("song_{stamp}.mp3");
        let song_path = self.config.output_dir.join(&file_name);
        info!(mood = %mood, "Mixing with instrumental");
        let report = self.mixer.mix_file(vocal.path(), mood, &song_path)?;
        drop(vocal);

        let outcome = SongOutcome {
            file_name,
            path: report.path,
            duration_secs: report.duration_secs,
            mode,
            mood,
            segments,
            silenced_segments: silenced,
            instrumental_used: report.instrumental_used,
            vocal_silent: waveform.is_silent(),
        };

        for warning in outcome.warnings() {
            warn!(file = %outcome.file_name, "{}", warning);
        }
        info!(
            file = %outcome.file_name,
            duration_secs = format!("{:.1}", outcome.duration_secs),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Song complete"
        );
        Ok(outcome)
    }

    fn synthesize(
        &self,
        text: &str,
        mode: SynthesisMode,
    ) -> Result<(Vec<SampleBuffer>, Vec<usize>), PipelineError> {
        match mode {
            SynthesisMode::Fast => {
                let buffer = self.synthesizer.synthesize_fast(text)?;
                Ok((vec![buffer], Vec::new()))
            }
            SynthesisMode::Chunked => {
                let segments = chunk_with_config(text, &self.config.chunker);
                if segments.iter().all(|s| s.is_empty()) {
                    return Err(PipelineError::InvalidInput(
                        "Text has no singable characters".to_string(),
                    ));
                }
                info!(segments = segments.len(), "Processing chunked text");
                let batch = self.synthesizer.synthesize_batch(&segments);
                Ok((batch.buffers, batch.silenced))
            }
        }
    }
}
