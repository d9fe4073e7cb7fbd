// src/sources/x_recent.rs
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use serde::Deserialize;

use super::{api_error, http_client, normalize_text, ContentSource, SourceError};
use crate::request::{FetchedItem, Source};

#[derive(Debug, Deserialize)]
struct SearchResp {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    errors: Vec<ApiProblem>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiProblem {
    title: Option<String>,
    detail: Option<String>,
}

/// X API v2 recent search (last 7 days).
pub struct XRecentSearchSource {
    http: Client,
    bearer_token: String,
    base_url: String,
    max_results: usize,
}

impl XRecentSearchSource {
    pub fn new(bearer_token: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            http: http_client(timeout)?,
            bearer_token: bearer_token.into(),
            base_url: "https://api.twitter.com/2".into(),
            max_results: 15,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_results(mut self, n: usize) -> Self {
        self.max_results = n.clamp(10, 100);
        self
    }
}

/// Search query for one topic: original posts only, English.
pub fn search_query(topic: &str) -> String {
    let topic = topic.trim();
    let needs_quotes = topic.contains(char::is_whitespace) && !topic.starts_with('"');
    if needs_quotes {
        format!("\"{topic}\" -is:retweet lang:en")
    } else {
        format!("{topic} -is:retweet lang:en")
    }
}

/// Parse a recent-search body. An empty `data` array (no matches) is not an error;
/// a body carrying only `errors` is.
pub fn parse_search(body: &str, topic: &str) -> Result<Vec<FetchedItem>, SourceError> {
    let resp: SearchResp =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(format!("x json: {e}")))?;

    if resp.data.is_empty() && !resp.errors.is_empty() {
        let message = resp
            .errors
            .iter()
            .map(|p| {
                format!(
                    "{}: {}",
                    p.title.as_deref().unwrap_or("error"),
                    p.detail.as_deref().unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SourceError::Api {
            status: 200,
            message,
        });
    }

    Ok(resp
        .data
        .into_iter()
        .filter_map(|t| {
            let text = normalize_text(&t.text);
            if text.is_empty() {
                return None;
            }
            Some(FetchedItem {
                source: Source::Social,
                topic: topic.to_string(),
                text,
                published_at: t
                    .created_at
                    .as_deref()
                    .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
                    .and_then(|dt| u64::try_from(dt.timestamp()).ok()),
                url: Some(format!("https://x.com/i/web/status/{}", t.id)),
            })
        })
        .collect())
}

#[async_trait]
impl ContentSource for XRecentSearchSource {
    #[tracing::instrument(skip(self), fields(provider = "x"))]
    async fn fetch(&self, topic: &str) -> Result<Vec<FetchedItem>, SourceError> {
        let t0 = std::time::Instant::now();
        let query = search_query(topic);
        let max_results = self.max_results.to_string();

        let resp = self
            .http
            .get(format!("{}/tweets/search/recent", self.base_url))
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", query.as_str()),
                ("max_results", max_results.as_str()),
                ("tweet.fields", "created_at"),
            ])
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let body = resp.text().await?;
        let items = parse_search(&body, topic)?;

        histogram!("newscast_fetch_ms", "provider" => "x")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("newscast_fetch_items_total", "provider" => "x").increment(items.len() as u64);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "x"
    }
}
