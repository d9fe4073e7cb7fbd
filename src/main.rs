//! newscast: binary entrypoint
//! Loads configuration once, wires the collaborators and boots the Axum HTTP server.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newscast::{build_app, metrics::Metrics, AppConfig};

/// Compact human logs by default, JSON lines with LOG_FORMAT=json.
/// `try_init` because the Shuttle runtime may have installed a subscriber already.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("newscast=info,tower_http=warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    // Missing credentials stop the process here, never per request.
    let cfg = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        news = ?cfg.news.provider,
        speech = ?cfg.speech.provider,
        budget = cfg.pipeline.prompt_budget_chars,
        max_topics = cfg.pipeline.max_topics,
        "configuration loaded"
    );

    let mut router = build_app(&cfg)?;
    match Metrics::init(&cfg.pipeline) {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics disabled"),
    }

    Ok(router.into())
}
