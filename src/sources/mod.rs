// src/sources/mod.rs
pub mod google_news_rss;
pub mod newsapi;
pub mod x_recent;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AppConfig, NewsProvider};
use crate::request::FetchedItem;

pub use google_news_rss::GoogleNewsRssSource;
pub use newsapi::NewsApiSource;
pub use x_recent::XRecentSearchSource;

pub(crate) const USER_AGENT: &str = concat!("newscast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("rate limited by upstream (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },
    #[error("unexpected payload: {0}")]
    Parse(String),
}

/// A provider of recent short text items for a topic.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, topic: &str) -> Result<Vec<FetchedItem>, SourceError>;
    fn name(&self) -> &'static str;
}

pub type DynSource = Arc<dyn ContentSource>;

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap per item: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }
    out
}

/// Join `title` and `description` the way headlines are read: "Title. Description".
pub(crate) fn headline(title: Option<&str>, description: Option<&str>) -> String {
    let title = normalize_text(title.unwrap_or_default());
    let description = normalize_text(description.unwrap_or_default());
    match (title.is_empty(), description.is_empty()) {
        (true, true) => String::new(),
        (false, true) => title,
        (true, false) => description,
        (false, false) => {
            let title = title.trim_end_matches(['.', '!', '?']);
            format!("{title}. {description}")
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
}

/// Read an error response body into `SourceError`, keeping 429 distinguishable.
pub(crate) async fn api_error(resp: reqwest::Response) -> SourceError {
    let status = resp.status().as_u16();
    if status == 429 {
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return SourceError::RateLimited { retry_after };
    }
    let message = resp.text().await.unwrap_or_default();
    SourceError::Api { status, message }
}

/// Build the news and social providers named by the config.
pub fn build_sources(cfg: &AppConfig) -> anyhow::Result<(DynSource, DynSource)> {
    let timeout = cfg.pipeline.fetch_timeout;

    let news: DynSource = match cfg.news.provider {
        NewsProvider::NewsApi => {
            let key = cfg
                .news
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("newsapi provider needs NEWS_API_KEY"))?;
            Arc::new(
                NewsApiSource::new(key, timeout)?
                    .with_base_url(&cfg.news.base_url)
                    .with_page_size(cfg.news.max_items)
                    .with_language(&cfg.news.language),
            )
        }
        NewsProvider::GoogleRss => Arc::new(
            GoogleNewsRssSource::new(timeout)?
                .with_base_url(&cfg.news.base_url)
                .with_max_items(cfg.news.max_items)
                .with_language(&cfg.news.language),
        ),
    };

    let social: DynSource = Arc::new(
        XRecentSearchSource::new(cfg.social.bearer_token.clone(), timeout)?
            .with_base_url(&cfg.social.base_url)
            .with_max_results(cfg.social.max_items),
    );

    tracing::info!(
        news = news.name(),
        social = social.name(),
        "content sources ready"
    );
    Ok((news, social))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let s = "  <b>Hello,&nbsp;&nbsp;</b> \u{201C}world\u{201D}  ";
        assert_eq!(normalize_text(s), r#"Hello, "world""#);
    }

    #[test]
    fn headline_joins_title_and_description() {
        assert_eq!(
            headline(Some("Chips rally!"), Some("Nvidia leads gains")),
            "Chips rally. Nvidia leads gains"
        );
        assert_eq!(headline(Some("Only title"), None), "Only title");
        assert_eq!(headline(None, Some("")), "");
    }

    #[test]
    fn very_long_items_are_capped() {
        let s = "a".repeat(4000);
        assert_eq!(normalize_text(&s).chars().count(), 1500);
    }
}
