use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::error::PipelineError;
use crate::orchestrator::SummaryOrchestrator;
use crate::request::{RawSummaryRequest, SummaryResult};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SummaryOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: SummaryOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

/// API routes only (no static UI). Used by tests and embedded callers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/generate-audio", post(generate_audio))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// API routes plus the web UI served from `static_dir`.
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    let ui = ServeDir::new(static_dir)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));
    router(state).fallback_service(ui)
}

#[tracing::instrument(skip_all)]
async fn generate_audio(
    State(state): State<AppState>,
    body: Result<Json<RawSummaryRequest>, JsonRejection>,
) -> Result<Json<SummaryResult>, PipelineError> {
    let Json(raw) = body.map_err(|e| PipelineError::InvalidRequest(e.body_text()))?;

    let result = state.orchestrator.handle(raw).await?;
    tracing::info!(
        summary_chars = result.summary_text.chars().count(),
        audio_b64_len = result.audio_base64.len(),
        warnings = result.warnings.len(),
        "generated audio summary"
    );
    Ok(Json(result))
}
