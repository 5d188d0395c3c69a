//! HTTP server for BeatBrains
//!
//! Routes:
//! - `POST /generate-song`: text + mood in, song URL out
//! - `GET /output/<file>`: generated songs
//! - `GET /`: service index
//! - `GET /healthz`: model readiness
//!
//! Song generation is blocking and runs on the blocking pool, gated by a
//! semaphore so model calls never overlap beyond `max_inflight`.

use std::{future::Future, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tokio::{net::TcpListener, sync::Semaphore};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    pipeline::{PipelineError, SongOutcome, SongPipeline, INVALID_TEXT_MESSAGE},
    protocol::{IndexResponse, SongRequest, SongResponse},
    tts::SpeechModelService,
};

/// Message returned for any internal failure
pub const GENERATION_FAILED_MESSAGE: &str = "Song generation failed";

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// The song pipeline
    pub pipeline: Arc<SongPipeline>,
    /// Model service, for readiness checks
    pub service: Arc<SpeechModelService>,
    /// Semaphore to limit concurrent song requests
    pub inflight: Arc<Semaphore>,
    /// Maximum number of concurrent song requests
    pub inflight_limit: usize,
}

impl AppState {
    /// Create a new application state
    pub fn new(
        pipeline: Arc<SongPipeline>,
        service: Arc<SpeechModelService>,
        max_inflight: usize,
    ) -> Self {
        let limit = max_inflight.max(1);
        Self {
            pipeline,
            service,
            inflight: Arc::new(Semaphore::new(limit)),
            inflight_limit: limit,
        }
    }
}

/// Create the Axum router with all routes
pub fn router(state: AppState) -> Router {
    let output_dir = state.pipeline.config().output_dir.clone();
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/generate-song", post(generate_song))
        .nest_service("/output", ServeDir::new(output_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server and serve requests indefinitely
pub async fn serve(
    listener: TcpListener,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
    serve_with_shutdown(listener, state, std::future::pending()).await
}

/// Start the server with graceful shutdown support
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);
    info!("starting axum server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("server shut down gracefully");
    Ok(())
}

/// Health check endpoint
async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    if state.service.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "model not ready")
    }
}

async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        status: "running".to_string(),
        message: "BeatBrains API with Bark AI Singing".to_string(),
        endpoints: vec![
            "/generate-song".to_string(),
            "/output/<filename>".to_string(),
            "/healthz".to_string(),
        ],
    })
}

fn success_response(outcome: &SongOutcome) -> SongResponse {
    SongResponse::Success {
        song_url: outcome.song_url(),
        duration_secs: outcome.duration_secs,
        mode: outcome.mode.to_string(),
        degraded: outcome.degraded(),
        warnings: outcome.warnings(),
    }
}

fn reply(status: StatusCode, body: SongResponse) -> (StatusCode, Json<SongResponse>) {
    (status, Json(body))
}

/// Song generation endpoint
async fn generate_song(
    State(state): State<AppState>,
    payload: Result<Json<SongRequest>, JsonRejection>,
) -> (StatusCode, Json<SongResponse>) {
    let request_id = Uuid::new_v4();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(request_id = %request_id, error = %rejection.body_text(), "rejected song request body");
            return reply(
                StatusCode::BAD_REQUEST,
                SongResponse::error(INVALID_TEXT_MESSAGE),
            );
        }
    };

    if state.pipeline.validate(&request.text).is_err() {
        warn!(
            request_id = %request_id,
            text_len = request.text.chars().count(),
            "invalid song text"
        );
        return reply(
            StatusCode::BAD_REQUEST,
            SongResponse::error(INVALID_TEXT_MESSAGE),
        );
    }

    let mood = request.mood();
    info!(request_id = %request_id, mood = %mood, "song request accepted");

    let permit = match state.inflight.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            error!(request_id = %request_id, "song semaphore closed");
            return reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                SongResponse::error(GENERATION_FAILED_MESSAGE),
            );
        }
    };

    let pipeline = state.pipeline.clone();
    let text = request.text;
    let result = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        pipeline.generate(&text, mood)
    })
    .await;

    match result {
        Ok(Ok(outcome)) => {
            info!(request_id = %request_id, song = %outcome.file_name, "song ready");
            reply(StatusCode::OK, success_response(&outcome))
        }
        Ok(Err(PipelineError::InvalidInput(message))) => {
            warn!(request_id = %request_id, %message, "song request rejected");
            reply(StatusCode::BAD_REQUEST, SongResponse::error(message))
        }
        Ok(Err(e)) => {
            error!(request_id = %request_id, error = %e, "song generation failed");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                SongResponse::error(GENERATION_FAILED_MESSAGE),
            )
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "song generation task panicked");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                SongResponse::error(GENERATION_FAILED_MESSAGE),
            )
        }
    }
}
