// src/request.rs
//! Request/response types that flow through one `/generate-audio` call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Which content sources a request wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    News,
    Social,
    Both,
}

impl SourceType {
    /// Sources in prompt order (news first).
    pub fn sources(self) -> &'static [Source] {
        match self {
            SourceType::News => &[Source::News],
            SourceType::Social => &[Source::Social],
            SourceType::Both => &[Source::News, Source::Social],
        }
    }
}

impl FromStr for SourceType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // older web forms send "x" for the social source
        match s.trim().to_ascii_lowercase().as_str() {
            "news" => Ok(SourceType::News),
            "social" | "x" | "twitter" => Ok(SourceType::Social),
            "both" => Ok(SourceType::Both),
            other => Err(PipelineError::InvalidRequest(format!(
                "unknown source_type '{other}' (expected news, social or both)"
            ))),
        }
    }
}

/// A single content provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    News,
    Social,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::News => "news",
            Source::Social => "social",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire shape of the inbound body. `source_type` stays a string here so an
/// unknown value is answered with `InvalidRequest` instead of a serde rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSummaryRequest {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub source_type: String,
}

/// Validated request. Only constructible through [`SummaryRequest::new`] or
/// [`RawSummaryRequest::validate`], so `topics` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    topics: Vec<String>,
    source_type: SourceType,
}

impl SummaryRequest {
    pub fn new<I, S>(topics: I, source_type: SourceType, max_topics: usize) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = Vec::new();
        for t in topics {
            let t = t.as_ref().trim();
            if t.is_empty() {
                return Err(PipelineError::InvalidRequest(
                    "topics must not contain blank entries".into(),
                ));
            }
            // repeats would fetch and prompt the same content twice; first one wins
            if !cleaned.iter().any(|c| c == t) {
                cleaned.push(t.to_string());
            }
        }

        if cleaned.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "at least one topic is required".into(),
            ));
        }
        if cleaned.len() > max_topics {
            return Err(PipelineError::InvalidRequest(format!(
                "too many topics: {} (max {max_topics})",
                cleaned.len()
            )));
        }

        Ok(Self {
            topics: cleaned,
            source_type,
        })
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }
}

impl RawSummaryRequest {
    pub fn validate(self, max_topics: usize) -> Result<SummaryRequest, PipelineError> {
        let source_type: SourceType = self.source_type.parse()?;
        SummaryRequest::new(self.topics, source_type, max_topics)
    }
}

/// One piece of fetched content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedItem {
    pub source: Source,
    pub topic: String,
    pub text: String,
    pub published_at: Option<u64>,
    pub url: Option<String>,
}

impl FetchedItem {
    pub fn new(source: Source, topic: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source,
            topic: topic.into(),
            text: text.into(),
            published_at: None,
            url: None,
        }
    }
}

/// Record of a fetch that failed without failing the whole request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub source: Source,
    pub topic: String,
    pub reason: String,
    pub timed_out: bool,
}

/// Successful pipeline output.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    #[serde(rename = "summary")]
    pub summary_text: String,
    /// Base64 (standard alphabet, padded) audio payload.
    #[serde(rename = "audio")]
    pub audio_base64: String,
    pub audio_mime: String,
    pub warnings: Vec<FetchFailure>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}
