//! Bark worker bridge
//!
//! Bark only exists as a Python package, so synthesis is delegated to a
//! long-lived worker process (`scripts/bark_worker.py`). The worker keeps the
//! models in memory between calls and speaks one JSON object per line over
//! stdin/stdout. Generated audio comes back as base64-encoded f32 LE samples.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::tts::{EngineInfo, SamplingParams, SpeechModel, TtsError};

/// Bark's native output rate, used until the worker reports its own
pub const BARK_SAMPLE_RATE: u32 = 24_000;

/// Request sent to the worker
#[derive(Serialize, Debug)]
#[serde(tag = "op", rename_all = "snake_case")]
enum WorkerRequest<'a> {
    Preload {
        trust_unsafe_deserialization: bool,
    },
    Generate {
        prompt: &'a str,
        history_prompt: &'a str,
        text_temp: f32,
        waveform_temp: f32,
    },
}

/// Reply from the worker
#[derive(Deserialize, Debug)]
struct WorkerResponse {
    ok: bool,
    sample_rate: Option<u32>,
    audio_base64: Option<String>,
    error: Option<String>,
}

/// A running worker process
struct Worker {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Worker {
    fn spawn(config: &WorkerConfig) -> anyhow::Result<Self> {
        let mut command = Command::new(&config.python);
        command
            .arg(&config.script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        // Bark treats any non-empty value as true, so unset means false.
        for (key, enabled) in [
            ("SUNO_USE_SMALL_MODELS", config.small_models),
            ("SUNO_ENABLE_MPS", config.enable_mps),
        ] {
            if enabled {
                command.env(key, "True");
            } else {
                command.env_remove(key);
            }
        }

        let mut child = command.spawn().with_context(|| {
            format!(
                "failed to start Bark worker: {} {}",
                config.python.display(),
                config.script.display()
            )
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("worker stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("worker stdout not captured"))?;

        info!(pid = child.id(), "Bark worker started");
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Send one request and wait for its reply
    fn round_trip(&mut self, request: &WorkerRequest<'_>) -> anyhow::Result<WorkerResponse> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .context("failed to write to Bark worker")?;
        self.stdin.flush()?;

        let mut reply = String::new();
        loop {
            reply.clear();
            let read = self
                .stdout
                .read_line(&mut reply)
                .context("failed to read from Bark worker")?;
            if read == 0 {
                bail!("Bark worker exited unexpectedly");
            }
            if !reply.trim().is_empty() {
                break;
            }
        }

        serde_json::from_str(reply.trim())
            .with_context(|| format!("malformed worker reply: {}", reply.trim()))
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!(error = %e, "Bark worker already gone");
        }
        let _ = self.child.wait();
    }
}

/// [`SpeechModel`] backed by a persistent Bark worker process
pub struct BarkBackend {
    config: WorkerConfig,
    worker: Mutex<Option<Worker>>,
    sample_rate: AtomicU32,
}

impl BarkBackend {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            worker: Mutex::new(None),
            sample_rate: AtomicU32::new(BARK_SAMPLE_RATE),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    fn preload_request(&self) -> WorkerRequest<'static> {
        WorkerRequest::Preload {
            trust_unsafe_deserialization: self.config.trust_unsafe_deserialization,
        }
    }

    /// Run `request` on the worker, starting (and preloading) one if needed.
    ///
    /// A worker that fails mid-call is dropped; the next call starts afresh.
    fn call(&self, request: &WorkerRequest<'_>) -> anyhow::Result<WorkerResponse> {
        let mut slot = self
            .worker
            .lock()
            .map_err(|_| anyhow!("Bark worker lock poisoned"))?;

        if slot.is_none() {
            let mut worker = Worker::spawn(&self.config)?;
            if !matches!(request, WorkerRequest::Preload { .. }) {
                let reply = worker.round_trip(&self.preload_request())?;
                self.accept(reply)?;
            }
            *slot = Some(worker);
        }

        let worker = slot
            .as_mut()
            .ok_or_else(|| anyhow!("Bark worker unavailable"))?;
        match worker.round_trip(request) {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(error = %e, "Bark worker failed, it will be restarted on next call");
                *slot = None;
                Err(e)
            }
        }
    }

    /// Check a reply's status and record the reported sample rate
    fn accept(&self, reply: WorkerResponse) -> anyhow::Result<WorkerResponse> {
        if !reply.ok {
            bail!(
                "Bark worker error: {}",
                reply.error.as_deref().unwrap_or("unknown error")
            );
        }
        if let Some(rate) = reply.sample_rate {
            self.sample_rate.store(rate, Ordering::Release);
        }
        Ok(reply)
    }

    fn preload_inner(&self) -> anyhow::Result<()> {
        let reply = self.call(&self.preload_request())?;
        self.accept(reply)?;
        Ok(())
    }

    fn generate_inner(
        &self,
        prompt: &str,
        voice_preset: &str,
        params: &SamplingParams,
    ) -> anyhow::Result<Vec<f32>> {
        let request = WorkerRequest::Generate {
            prompt,
            history_prompt: voice_preset,
            text_temp: params.text_temp,
            waveform_temp: params.waveform_temp,
        };
        let reply = self.accept(self.call(&request)?)?;
        let audio = reply
            .audio_base64
            .ok_or_else(|| anyhow!("No audio data in response"))?;
        decode_samples(&audio)
    }
}

impl SpeechModel for BarkBackend {
    fn preload(&self) -> Result<(), TtsError> {
        self.preload_inner()
            .map_err(|e| TtsError::WorkerError(format!("{e:#}")))
    }

    fn generate(
        &self,
        prompt: &str,
        voice_preset: &str,
        params: &SamplingParams,
    ) -> Result<Vec<f32>, TtsError> {
        self.generate_inner(prompt, voice_preset, params)
            .map_err(|e| TtsError::WorkerError(format!("{e:#}")))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Acquire)
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: "Bark".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            sample_rate: self.sample_rate(),
        }
    }
}

/// Decode base64 little-endian f32 samples
fn decode_samples(audio_base64: &str) -> anyhow::Result<Vec<f32>> {
    let bytes = general_purpose::STANDARD.decode(audio_base64)?;
    if bytes.len() % 4 != 0 {
        bail!("audio payload is {} bytes, not a multiple of 4", bytes.len());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
