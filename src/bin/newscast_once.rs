//! Runs the summary pipeline once from the command line and writes the MP3 next to
//! a printed summary. Uses the same configuration as the server.

use std::path::PathBuf;

use anyhow::Context;
use base64::Engine as _;
use clap::Parser;

use newscast::{request::RawSummaryRequest, AppConfig, SummaryOrchestrator};

#[derive(Debug, Parser)]
#[command(name = "newscast_once", about = "Summarize topics into an audio briefing")]
struct Args {
    /// news | social | both
    #[arg(short, long, default_value = "both")]
    source_type: String,

    /// Where to write the audio file
    #[arg(short, long, default_value = "summary.mp3")]
    out: PathBuf,

    /// Topics to cover
    #[arg(required = true)]
    topics: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let cfg = AppConfig::load().context("loading configuration")?;
    let orchestrator = SummaryOrchestrator::from_config(&cfg)?;

    let result = orchestrator
        .handle(RawSummaryRequest {
            topics: args.topics,
            source_type: args.source_type,
        })
        .await?;

    for w in &result.warnings {
        tracing::warn!(source = %w.source, topic = %w.topic, reason = %w.reason, "fetch skipped");
    }

    let audio = base64::engine::general_purpose::STANDARD
        .decode(&result.audio_base64)
        .context("decoding audio payload")?;
    tokio::fs::write(&args.out, &audio)
        .await
        .with_context(|| format!("writing {}", args.out.display()))?;

    println!("{}\n", result.summary_text);
    println!("audio: {} ({} bytes, {})", args.out.display(), audio.len(), result.audio_mime);
    Ok(())
}
