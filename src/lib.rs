// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod request;
pub mod sources;
pub mod speech;
pub mod summarize;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, router, AppState};
pub use crate::config::AppConfig;
pub use crate::error::PipelineError;
pub use crate::orchestrator::SummaryOrchestrator;
pub use crate::request::{FetchedItem, Source, SourceType, SummaryRequest, SummaryResult};

use axum::Router;

/// Build the full HTTP app (API + web UI) from a resolved config.
pub fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let orchestrator = SummaryOrchestrator::from_config(cfg)?;
    if !cfg.static_dir.join("index.html").exists() {
        tracing::warn!(dir = %cfg.static_dir.display(), "web UI not found; only the API is served");
    }
    Ok(create_router(AppState::new(orchestrator), &cfg.static_dir))
}
