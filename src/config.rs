//! Configuration and CLI for the BeatBrains song server

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::protocol::Mood;

/// Command line arguments with subcommands
#[derive(Parser, Debug, Clone)]
#[command(name = "beatbrains")]
#[command(about = "Turn short text into a sung track over a mood-based instrumental")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP song server
    Serve(ServeArgs),
    /// Generate a single song from the terminal
    Generate(GenerateArgs),
}

/// Options for the Bark worker process
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Python interpreter used to run the Bark worker
    #[arg(long, default_value = "python3")]
    pub python: PathBuf,

    /// Path to the Bark worker script
    #[arg(long, default_value = "scripts/bark_worker.py")]
    pub worker_script: PathBuf,

    /// Bark history prompt (voice preset)
    #[arg(long, default_value = "v2/en_speaker_6")]
    pub voice_preset: String,

    /// Sampling temperature for the semantic (text) stage
    #[arg(long, default_value_t = 0.7)]
    pub text_temp: f32,

    /// Sampling temperature for the acoustic (waveform) stage
    #[arg(long, default_value_t = 0.7)]
    pub waveform_temp: f32,

    /// Allow the worker to load full pickled checkpoints
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub trust_unsafe_deserialization: bool,

    /// Load the small Bark checkpoints
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub small_models: bool,

    /// Let Bark use Apple MPS
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub enable_mps: bool,
}

impl ModelArgs {
    /// Worker settings derived from the CLI
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            python: self.python.clone(),
            script: self.worker_script.clone(),
            trust_unsafe_deserialization: self.trust_unsafe_deserialization,
            small_models: self.small_models,
            enable_mps: self.enable_mps,
        }
    }

    /// Synthesis settings derived from the CLI
    pub fn synthesis_config(&self) -> SynthesisConfig {
        SynthesisConfig {
            voice_preset: self.voice_preset.clone(),
            text_temp: self.text_temp,
            waveform_temp: self.waveform_temp,
            ..Default::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 5000)]
    pub port: u16,

    /// Directory for generated songs
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Directory holding <mood>.mp3 instrumentals
    #[arg(long, default_value = "assets/instrumentals")]
    pub assets_dir: PathBuf,

    /// Maximum song requests processed at once
    #[arg(long, default_value_t = 1)]
    pub max_inflight: usize,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log: String,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl ServeArgs {
    /// Pipeline settings for this server
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            output_dir: self.output_dir.clone(),
            assets_dir: self.assets_dir.clone(),
            ..Default::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Text to sing
    #[arg(short, long, group = "input")]
    pub text: Option<String>,

    /// File containing the text to sing
    #[arg(short, long, group = "input")]
    pub file: Option<PathBuf>,

    /// Instrumental mood (happy, sad, motivational)
    #[arg(short, long, default_value = "happy")]
    pub mood: String,

    /// Where to copy the finished song
    #[arg(short, long, default_value = "song.mp3")]
    pub output: PathBuf,

    /// Directory for intermediate files
    #[arg(long, default_value = "output")]
    pub work_dir: PathBuf,

    /// Directory holding <mood>.mp3 instrumentals
    #[arg(long, default_value = "assets/instrumentals")]
    pub assets_dir: PathBuf,

    /// Print verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl GenerateArgs {
    /// Requested mood, falling back to happy
    pub fn mood(&self) -> Mood {
        Mood::parse_or_default(&self.mood)
    }

    /// Pipeline settings for a one-off run
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            output_dir: self.work_dir.clone(),
            assets_dir: self.assets_dir.clone(),
            ..Default::default()
        }
    }
}

/// Chunker configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Input is truncated to this many characters before chunking
    pub max_total_chars: usize,
    /// Maximum characters per segment
    pub max_segment_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_total_chars: 500,
            max_segment_chars: 120,
        }
    }
}

/// Per-call synthesis settings
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesisConfig {
    /// Bark history prompt
    pub voice_preset: String,
    /// Semantic stage temperature
    pub text_temp: f32,
    /// Acoustic stage temperature
    pub waveform_temp: f32,
    /// Seconds of silence substituted for a failed segment
    pub silence_on_failure_secs: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            voice_preset: "v2/en_speaker_6".to_string(),
            text_temp: 0.7,
            waveform_temp: 0.7,
            silence_on_failure_secs: 2.0,
        }
    }
}

/// Bark worker process settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Python interpreter
    pub python: PathBuf,
    /// Worker script path
    pub script: PathBuf,
    /// Forwarded to the worker's checkpoint loader
    pub trust_unsafe_deserialization: bool,
    /// Exported as SUNO_USE_SMALL_MODELS
    pub small_models: bool,
    /// Exported as SUNO_ENABLE_MPS
    pub enable_mps: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            script: PathBuf::from("scripts/bark_worker.py"),
            trust_unsafe_deserialization: true,
            small_models: true,
            enable_mps: false,
        }
    }
}

/// End-to-end pipeline configuration
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Where songs and temporary vocals are written
    pub output_dir: PathBuf,
    /// Where instrumentals are looked up
    pub assets_dir: PathBuf,
    /// Inputs shorter than this (in characters) skip chunking
    pub fast_path_chars: usize,
    /// Hard limit on request text length
    pub max_text_chars: usize,
    /// Chunker configuration
    pub chunker: ChunkerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            assets_dir: PathBuf::from("assets/instrumentals"),
            fast_path_chars: 100,
            max_text_chars: 500,
            chunker: ChunkerConfig::default(),
        }
    }
}

/// Initialize tracing with given log level
pub fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Load environment variables from .env file
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_serve() {
        let cli = Cli::parse_from(["beatbrains", "serve"]);
        assert!(matches!(cli.command, Commands::Serve(_)));
    }

    #[test]
    fn test_serve_args_defaults() {
        let cli = Cli::parse_from(["beatbrains", "serve"]);
        let args = match cli.command {
            Commands::Serve(a) => a,
            _ => panic!("expected serve command"),
        };
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 5000);
        assert_eq!(args.max_inflight, 1);
        assert_eq!(args.output_dir, PathBuf::from("output"));
        assert_eq!(args.model.voice_preset, "v2/en_speaker_6");
        assert!(args.model.trust_unsafe_deserialization);
        assert!(args.model.small_models);
        assert!(!args.model.enable_mps);
    }

    #[test]
    fn test_model_flags_take_values() {
        let cli = Cli::parse_from([
            "beatbrains",
            "serve",
            "--trust-unsafe-deserialization",
            "false",
            "--text-temp",
            "0.5",
        ]);
        let args = match cli.command {
            Commands::Serve(a) => a,
            _ => panic!("expected serve command"),
        };
        assert!(!args.model.worker_config().trust_unsafe_deserialization);
        assert_eq!(args.model.synthesis_config().text_temp, 0.5);
        assert_eq!(args.model.synthesis_config().silence_on_failure_secs, 2.0);
    }

    #[test]
    fn test_generate_args_mood_fallback() {
        let cli = Cli::parse_from(["beatbrains", "generate", "--text", "hi", "--mood", "angry"]);
        let args = match cli.command {
            Commands::Generate(a) => a,
            _ => panic!("expected generate command"),
        };
        assert_eq!(args.mood(), Mood::Happy);
        assert_eq!(args.pipeline_config().output_dir, PathBuf::from("output"));
    }

    #[test]
    fn test_generate_text_and_file_conflict() {
        let result = Cli::try_parse_from([
            "beatbrains",
            "generate",
            "--text",
            "hi",
            "--file",
            "lyrics.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_chunker_config_default() {
        let config = ChunkerConfig::default();
        assert_eq!(config.max_total_chars, 500);
        assert_eq!(config.max_segment_chars, 120);
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.fast_path_chars, 100);
        assert_eq!(config.max_text_chars, 500);
        assert_eq!(config.chunker, ChunkerConfig::default());
    }

    #[test]
    fn test_pipeline_config_takes_dirs_from_args() {
        let cli = Cli::parse_from([
            "beatbrains",
            "generate",
            "--text",
            "la la",
            "--work-dir",
            "scratch",
            "--text-temp",
            "0.4",
        ]);
        let args = match cli.command {
            Commands::Generate(a) => a,
            _ => panic!("expected generate command"),
        };
        let config = args.pipeline_config();
        assert_eq!(config.output_dir, PathBuf::from("scratch"));
        assert_eq!(config.assets_dir, args.assets_dir);
        assert_eq!(config.max_text_chars, 500);
        // Sampling settings live only on the synthesizer
        assert_eq!(args.model.synthesis_config().text_temp, 0.4);
    }
}
