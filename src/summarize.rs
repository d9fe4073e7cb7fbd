// src/summarize.rs
//! Summarizer capability + OpenAI-compatible chat-completions client (Groq by default).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SummarizerConfig;
use crate::sources::USER_AGENT;

/// Fixed instruction sent with every prompt.
pub const SYSTEM_PROMPT: &str = "You are a precise summarization assistant. \
Only use the information given in the news and posts below. \
Do not add unrelated facts, opinions, or assumptions. \
Summarize in 10-15 bullet points, each under 50 words. \
Output only the bullet list.";

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("No content in response")]
    Empty,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Returns plain-text bullet points for `body`.
    async fn summarize(&self, instruction: &str, body: &str) -> Result<String, SummarizeError>;
    fn name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Build the user message the way the model sees it.
pub fn user_message(body: &str) -> String {
    format!("{body}\n\nNow summarize.")
}

/// Remove `<think>...</think>` blocks that reasoning models prepend, then trim.
pub fn strip_reasoning(raw: &str) -> String {
    static RE_THINK: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think regex"));
    let out = RE_THINK.replace_all(raw, "");
    // unterminated block: nothing after it is usable
    let out = match out.find("<think>") {
        Some(idx) => &out[..idx],
        None => &out[..],
    };
    out.trim().to_string()
}

pub struct ChatCompletionsSummarizer {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatCompletionsSummarizer {
    pub fn new(cfg: &SummarizerConfig, timeout: Duration) -> Result<Self, SummarizeError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

/// Pull the first choice's text out of a completions body.
pub fn parse_completion(body: &str) -> Result<String, SummarizeError> {
    let resp: Resp = serde_json::from_str(body).map_err(|e| SummarizeError::Api {
        status: 200,
        message: format!("invalid JSON from summarizer: {e}"),
    })?;
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    let cleaned = strip_reasoning(&content);
    if cleaned.is_empty() {
        return Err(SummarizeError::Empty);
    }
    Ok(cleaned)
}

#[async_trait]
impl Summarizer for ChatCompletionsSummarizer {
    #[tracing::instrument(skip_all, fields(model = %self.model, body_chars = body.chars().count()))]
    async fn summarize(&self, instruction: &str, body: &str) -> Result<String, SummarizeError> {
        let user = user_message(body);
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: instruction,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.0,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(SummarizeError::Api { status, message });
        }

        let body = resp.text().await?;
        parse_completion(&body)
    }

    fn name(&self) -> &'static str {
        "chat-completions"
    }
}
