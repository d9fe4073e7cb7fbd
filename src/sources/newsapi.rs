// src/sources/newsapi.rs
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use serde::Deserialize;

use super::{api_error, headline, http_client, ContentSource, SourceError};
use crate::request::{FetchedItem, Source};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResp {
    status: String,
    #[serde(default)]
    articles: Vec<Article>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

/// NewsAPI `/v2/everything` search.
pub struct NewsApiSource {
    http: Client,
    api_key: String,
    base_url: String,
    page_size: usize,
    language: String,
}

impl NewsApiSource {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key: api_key.into(),
            base_url: "https://newsapi.org/v2".into(),
            page_size: 5,
            language: "en".into(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = n.clamp(1, 100);
        self
    }

    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.language = lang.into();
        self
    }
}

/// Turn an `/everything` body into items; keeps at most `limit` articles.
pub fn parse_everything(body: &str, topic: &str, limit: usize) -> Result<Vec<FetchedItem>, SourceError> {
    let resp: EverythingResp =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(format!("newsapi json: {e}")))?;

    if resp.status != "ok" {
        return Err(SourceError::Api {
            status: 200,
            message: format!(
                "{}: {}",
                resp.code.unwrap_or_else(|| "error".into()),
                resp.message.unwrap_or_default()
            ),
        });
    }

    let items = resp
        .articles
        .into_iter()
        // NewsAPI marks purged articles with this placeholder title
        .filter(|a| a.title.as_deref() != Some("[Removed]"))
        .filter_map(|a| {
            let text = headline(a.title.as_deref(), a.description.as_deref());
            if text.is_empty() {
                return None;
            }
            Some(FetchedItem {
                source: Source::News,
                topic: topic.to_string(),
                text,
                published_at: a.published_at.as_deref().and_then(parse_rfc3339_to_unix),
                url: a.url,
            })
        })
        .take(limit)
        .collect();
    Ok(items)
}

fn parse_rfc3339_to_unix(ts: &str) -> Option<u64> {
    chrono::DateTime::parse_from_rfc3339(ts)
        .ok()
        .and_then(|dt| u64::try_from(dt.timestamp()).ok())
}

#[async_trait]
impl ContentSource for NewsApiSource {
    #[tracing::instrument(skip(self), fields(provider = "newsapi"))]
    async fn fetch(&self, topic: &str) -> Result<Vec<FetchedItem>, SourceError> {
        let t0 = std::time::Instant::now();
        let page_size = self.page_size.to_string();

        let resp = self
            .http
            .get(format!("{}/everything", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", topic),
                ("language", self.language.as_str()),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let body = resp.text().await?;
        let items = parse_everything(&body, topic, self.page_size)?;

        histogram!("newscast_fetch_ms", "provider" => "newsapi")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("newscast_fetch_items_total", "provider" => "newsapi")
            .increment(items.len() as u64);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
