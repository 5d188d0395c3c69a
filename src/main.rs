//! BeatBrains - text to song from the command line
//!
//! A single binary providing:
//! - `serve` - Run the HTTP song server
//! - `generate` - Turn a piece of text into one MP3
//!
//! Usage:
//!   beatbrains serve --port 5000
//!   beatbrains generate --text "Hello world. This is a test!" --mood sad

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info};

use beatbrains::{
    cli_style::{
        print_banner, print_box, print_error, print_info, print_section, print_server_startup,
        print_success, print_warning,
    },
    config::{init_tracing, load_dotenv, Cli, Commands, GenerateArgs, ModelArgs, ServeArgs},
    pipeline::SongPipeline,
    python_backend::BarkBackend,
    server::{self, AppState},
    tts::{SpeechModelService, VoiceSynthesizer},
};

/// Main entry point with subcommand dispatch
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    load_dotenv();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => run_server(args).await,
        Commands::Generate(args) => run_generate(args).await,
    }
}

/// Start the Bark worker and wait for the models to load
async fn initialize_model(
    model: &ModelArgs,
) -> Result<Arc<SpeechModelService>, Box<dyn std::error::Error>> {
    let backend = BarkBackend::new(model.worker_config());
    let service = Arc::new(SpeechModelService::new(Arc::new(backend)));

    let start = Instant::now();
    let init = service.clone();
    tokio::task::spawn_blocking(move || init.initialize()).await??;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "speech model initialized"
    );
    Ok(service)
}

/// Rename `from` to `to`, copying and removing when a rename is not possible
/// (different filesystems)
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Err(e) = std::fs::rename(from, to) {
        debug!(error = %e, "rename failed, falling back to copy");
        std::fs::copy(from, to)?;
        std::fs::remove_file(from)?;
    }
    Ok(())
}

/// Run the song server
async fn run_server(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&args.log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting beatbrains server"
    );

    std::fs::create_dir_all(&args.output_dir)?;

    print_info("Loading Bark AI models...");
    let service = match initialize_model(&args.model).await {
        Ok(service) => {
            print_success("Bark models loaded successfully!");
            service
        }
        Err(e) => {
            print_error(&format!("Failed to initialize speech model: {}", e));
            return Err(e);
        }
    };

    let synthesizer = VoiceSynthesizer::new(service.clone(), args.model.synthesis_config())?;
    let pipeline = Arc::new(SongPipeline::new(synthesizer, args.pipeline_config()));
    let state = AppState::new(pipeline, service.clone(), args.max_inflight);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            info!(address = %addr, "server bound to address");
            l
        }
        Err(e) => {
            error!(address = %addr, error = %e, "failed to bind to address");
            return Err(e.into());
        }
    };

    print_server_startup(
        &args.host,
        args.port,
        &[
            ("Host", args.host.clone()),
            ("Port", args.port.to_string()),
            ("Model", service.info().name),
            ("Voice", args.model.voice_preset.clone()),
            ("Output", args.output_dir.display().to_string()),
            ("Assets", args.assets_dir.display().to_string()),
            ("Max in-flight", state.inflight_limit.to_string()),
        ],
    );

    let shutdown = shutdown_signal();

    info!("server ready - accepting connections");
    if let Err(e) = server::serve_with_shutdown(listener, state, shutdown).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("server exited cleanly");
    Ok(())
}

/// Generate a single song and move it to `--output`
async fn run_generate(args: GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(if args.verbose { "debug" } else { "warn" });

    print_banner();
    print_section("🎵  Song Generator");

    let text = match (&args.text, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            print_error("Provide --text or --file");
            return Err("no input text".into());
        }
    };
    let mood = args.mood();

    print_box(
        "Configuration",
        &[
            ("Mood", mood.to_string()),
            ("Characters", text.chars().count().to_string()),
            ("Voice", args.model.voice_preset.clone()),
            ("Output", args.output.display().to_string()),
        ],
    );

    print_info("Loading Bark AI models...");
    let service = initialize_model(&args.model).await?;
    let synthesizer = VoiceSynthesizer::new(service, args.model.synthesis_config())?;
    let pipeline = Arc::new(SongPipeline::new(synthesizer, args.pipeline_config()));

    print_info("Generating singing voice...");
    let start = Instant::now();
    let outcome = tokio::task::spawn_blocking(move || pipeline.generate(&text, mood)).await?;
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            print_error(&format!("Song generation failed: {}", e));
            return Err(e.into());
        }
    };

    let output: PathBuf = args.output.clone();
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    move_file(&outcome.path, &output)?;

    for warning in outcome.warnings() {
        print_warning(&warning);
    }
    print_box(
        "Song",
        &[
            ("File", output.display().to_string()),
            ("Duration", format!("{:.1}s", outcome.duration_secs)),
            ("Mode", outcome.mode.to_string()),
            ("Segments", outcome.segments.to_string()),
            ("Elapsed", format!("{:.1}s", start.elapsed().as_secs_f32())),
        ],
    );
    print_success(&format!("Song complete: {}", output.display()));
    Ok(())
}

/// Create a future that resolves on shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("received SIGTERM, shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["beatbrains", "serve", "--port", "8888"]);
        assert!(matches!(cli.command, Commands::Serve(args) if args.port == 8888));
    }

    #[test]
    fn test_generate_parsing() {
        let cli = Cli::parse_from(["beatbrains", "generate", "--text", "hi", "--mood", "sad"]);
        assert!(matches!(cli.command, Commands::Generate(args) if args.text.as_deref() == Some("hi")));
    }

    #[test]
    fn test_move_file_leaves_only_destination() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("work").join("song_1.mp3");
        std::fs::create_dir_all(from.parent().unwrap()).unwrap();
        std::fs::write(&from, b"ID3").unwrap();

        let to = dir.path().join("song.mp3");
        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"ID3");
    }

    #[test]
    fn test_move_file_missing_source_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = move_file(&dir.path().join("absent.mp3"), &dir.path().join("out.mp3"));
        assert!(result.is_err());
    }
}
