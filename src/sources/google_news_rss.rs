// src/sources/google_news_rss.rs
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use super::{api_error, headline, http_client, ContentSource, SourceError};
use crate::request::{FetchedItem, Source};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<u64> {
    let ts = ts.trim();
    OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| match ts.strip_suffix(" GMT") {
            Some(head) => OffsetDateTime::parse(&format!("{head} +0000"), &Rfc2822),
            None => OffsetDateTime::parse(ts, &Rfc2822),
        })
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

/// Google News search feed. Needs no credential.
pub struct GoogleNewsRssSource {
    http: Client,
    base_url: String,
    max_items: usize,
    language: String,
}

impl GoogleNewsRssSource {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: "https://news.google.com/rss".into(),
            max_items: 5,
            language: "en".into(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_items(mut self, n: usize) -> Self {
        self.max_items = n.max(1);
        self
    }

    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.language = lang.into();
        self
    }
}

/// Parse a feed document into items, newest first, at most `limit`.
pub fn parse_feed(xml: &str, topic: &str, limit: usize) -> Result<Vec<FetchedItem>, SourceError> {
    let rss: Rss = from_str(xml).map_err(|e| SourceError::Parse(format!("rss xml: {e}")))?;

    let mut out: Vec<FetchedItem> = rss
        .channel
        .item
        .into_iter()
        .filter_map(|it| {
            // Google's description is an HTML link to the same headline; the title is enough
            let text = headline(it.title.as_deref(), None);
            let text = if text.is_empty() {
                headline(None, it.description.as_deref())
            } else {
                text
            };
            if text.is_empty() {
                return None;
            }
            Some(FetchedItem {
                source: Source::News,
                topic: topic.to_string(),
                text,
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
                url: it.link,
            })
        })
        .collect();

    // stable: undated items keep feed order at the end
    out.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    out.truncate(limit);
    Ok(out)
}

#[async_trait]
impl ContentSource for GoogleNewsRssSource {
    #[tracing::instrument(skip(self), fields(provider = "google_rss"))]
    async fn fetch(&self, topic: &str) -> Result<Vec<FetchedItem>, SourceError> {
        let t0 = std::time::Instant::now();
        let lang = self.language.to_ascii_lowercase();
        let hl = format!("{lang}-US");
        let ceid = format!("US:{lang}");

        let resp = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", topic),
                ("hl", hl.as_str()),
                ("gl", "US"),
                ("ceid", ceid.as_str()),
            ])
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let xml = resp.text().await?;
        let items = parse_feed(&xml, topic, self.max_items)?;

        histogram!("newscast_fetch_ms", "provider" => "google_rss")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("newscast_fetch_items_total", "provider" => "google_rss")
            .increment(items.len() as u64);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "google_rss"
    }
}
