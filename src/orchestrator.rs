// src/orchestrator.rs
//! # Summary Request Orchestrator
//! validate -> fan-out fetch -> aggregate -> summarize -> synthesize -> assemble.
//!
//! Fetch failures are recorded and skipped; everything after the fetch stage is
//! all-or-nothing with a single attempt per call.

use std::future::Future;
use std::time::{Duration, Instant};

use base64::Engine as _;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;

use crate::aggregate::build_prompt_body;
use crate::config::{AppConfig, PipelineSettings};
use crate::error::PipelineError;
use crate::request::{
    FetchFailure, FetchedItem, RawSummaryRequest, Source, SummaryRequest, SummaryResult,
};
use crate::sources::{build_sources, DynSource};
use crate::speech::{build_speech, DynSpeech};
use crate::summarize::{ChatCompletionsSummarizer, DynSummarizer, SYSTEM_PROMPT};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        metrics::describe_counter!("newscast_requests_total", "Summary requests accepted.");
        metrics::describe_counter!(
            "newscast_fetch_errors_total",
            "Source fetches that failed or timed out."
        );
        metrics::describe_counter!(
            "newscast_pipeline_failures_total",
            "Requests that ended in a fatal pipeline error, by stage."
        );
        metrics::describe_histogram!(
            "newscast_pipeline_ms",
            "End-to-end pipeline time in milliseconds."
        );
    });
}

/// Outcome of one bounded external call.
enum Bounded<T, E> {
    Done(Result<T, E>),
    TimedOut,
}

async fn bounded<T, E, F>(limit: Duration, fut: F) -> Bounded<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => Bounded::Done(res),
        Err(_) => Bounded::TimedOut,
    }
}

pub struct SummaryOrchestrator {
    settings: PipelineSettings,
    news: DynSource,
    social: DynSource,
    summarizer: DynSummarizer,
    speech: DynSpeech,
}

impl SummaryOrchestrator {
    pub fn new(
        settings: PipelineSettings,
        news: DynSource,
        social: DynSource,
        summarizer: DynSummarizer,
        speech: DynSpeech,
    ) -> Self {
        Self {
            settings,
            news,
            social,
            summarizer,
            speech,
        }
    }

    /// Wire the real HTTP collaborators named by the config.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let (news, social) = build_sources(cfg)?;
        let summarizer: DynSummarizer = std::sync::Arc::new(ChatCompletionsSummarizer::new(
            &cfg.summarizer,
            cfg.pipeline.summarize_timeout,
        )?);
        let speech = build_speech(cfg)?;
        tracing::info!(
            model = %cfg.summarizer.model,
            key_len = cfg.summarizer.api_key.len(),
            "summarizer ready"
        );
        Ok(Self::new(cfg.pipeline.clone(), news, social, summarizer, speech))
    }

    /// Validate a wire request against this orchestrator's limits.
    pub fn validate(&self, raw: RawSummaryRequest) -> Result<SummaryRequest, PipelineError> {
        raw.validate(self.settings.max_topics)
    }

    /// Validate and run in one step; used by the HTTP handler.
    pub async fn handle(&self, raw: RawSummaryRequest) -> Result<SummaryResult, PipelineError> {
        let req = self.validate(raw)?;
        self.run(&req).await
    }

    #[tracing::instrument(skip_all, fields(topics = ?req.topics(), source_type = ?req.source_type()))]
    pub async fn run(&self, req: &SummaryRequest) -> Result<SummaryResult, PipelineError> {
        ensure_metrics_described();
        counter!("newscast_requests_total").increment(1);
        let t0 = Instant::now();

        let res = self.run_stages(req).await;

        histogram!("newscast_pipeline_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        if let Err(e) = &res {
            counter!("newscast_pipeline_failures_total", "stage" => e.stage()).increment(1);
            tracing::warn!(stage = e.stage(), error = %e, "pipeline failed");
        }
        res
    }

    async fn run_stages(&self, req: &SummaryRequest) -> Result<SummaryResult, PipelineError> {
        let (items, warnings) = self.fetch_all(req).await;
        if items.is_empty() {
            return Err(PipelineError::NoContentAvailable { failures: warnings });
        }

        let body = build_prompt_body(
            req.topics(),
            &items,
            self.settings.prompt_budget_chars,
            self.settings.per_topic_chars,
        );
        tracing::info!(
            items_used = body.items_used,
            items_dropped = body.items_dropped,
            truncated = body.truncated,
            chars = body.text.chars().count(),
            "prompt assembled"
        );

        let summary = self.summarize(&body.text).await?;
        let audio = self.synthesize(&summary).await?;

        Ok(SummaryResult {
            summary_text: summary,
            audio_base64: base64::engine::general_purpose::STANDARD.encode(&audio.bytes),
            audio_mime: audio.mime,
            warnings,
            generated_at: chrono::Utc::now(),
        })
    }

    fn source_for(&self, source: Source) -> &DynSource {
        match source {
            Source::News => &self.news,
            Source::Social => &self.social,
        }
    }

    /// Run every (topic, source) fetch concurrently. Results come back in
    /// (topic, source) order regardless of completion order.
    async fn fetch_all(&self, req: &SummaryRequest) -> (Vec<FetchedItem>, Vec<FetchFailure>) {
        let calls = req.topics().iter().flat_map(|topic| {
            req.source_type().sources().iter().map(move |&src| {
                let provider = self.source_for(src);
                async move {
                    let out = bounded(self.settings.fetch_timeout, provider.fetch(topic)).await;
                    (src, topic, provider.name(), out)
                }
            })
        });
        let results = futures::future::join_all(calls).await;

        let mut items = Vec::new();
        let mut failures = Vec::new();
        for (src, topic, provider, out) in results {
            let (reason, timed_out) = match out {
                Bounded::Done(Ok(mut got)) => {
                    tracing::debug!(%src, %topic, provider, count = got.len(), "fetch ok");
                    // providers tag items themselves; keep the grouping keys authoritative
                    for it in got.iter_mut() {
                        it.source = src;
                        it.topic = topic.clone();
                    }
                    items.append(&mut got);
                    continue;
                }
                Bounded::Done(Err(e)) => (e.to_string(), false),
                Bounded::TimedOut => (
                    format!("timed out after {:?}", self.settings.fetch_timeout),
                    true,
                ),
            };
            tracing::warn!(%src, %topic, provider, error = %reason, timed_out, "fetch failed");
            counter!("newscast_fetch_errors_total", "provider" => provider).increment(1);
            failures.push(FetchFailure {
                source: src,
                topic: topic.clone(),
                reason,
                timed_out,
            });
        }
        (items, failures)
    }

    async fn summarize(&self, body: &str) -> Result<String, PipelineError> {
        match bounded(
            self.settings.summarize_timeout,
            self.summarizer.summarize(SYSTEM_PROMPT, body),
        )
        .await
        {
            Bounded::Done(Ok(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Bounded::Done(Ok(_)) => Err(PipelineError::SummarizationFailed {
                detail: "summarizer returned empty content".into(),
                timed_out: false,
            }),
            Bounded::Done(Err(e)) => Err(PipelineError::SummarizationFailed {
                detail: e.to_string(),
                timed_out: false,
            }),
            Bounded::TimedOut => Err(PipelineError::SummarizationFailed {
                detail: format!("timed out after {:?}", self.settings.summarize_timeout),
                timed_out: true,
            }),
        }
    }

    async fn synthesize(&self, summary: &str) -> Result<crate::speech::AudioClip, PipelineError> {
        match bounded(self.settings.speech_timeout, self.speech.synthesize(summary)).await {
            Bounded::Done(Ok(clip)) if !clip.bytes.is_empty() => Ok(clip),
            Bounded::Done(Ok(_)) => Err(PipelineError::AudioGenerationFailed {
                detail: "synthesizer returned no audio".into(),
                timed_out: false,
            }),
            Bounded::Done(Err(e)) => Err(PipelineError::AudioGenerationFailed {
                detail: e.to_string(),
                timed_out: false,
            }),
            Bounded::TimedOut => Err(PipelineError::AudioGenerationFailed {
                detail: format!("timed out after {:?}", self.settings.speech_timeout),
                timed_out: true,
            }),
        }
    }
}
