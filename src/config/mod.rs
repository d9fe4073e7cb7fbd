// src/config/mod.rs
//! Process configuration, resolved once at start-up.
//!
//! Layering: built-in defaults -> optional TOML file -> environment variables.
//! Credentials are only ever read from the environment.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/newscast.toml";
pub const ENV_CONFIG_PATH: &str = "NEWSCAST_CONFIG_PATH";

pub const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";
pub const ENV_X_BEARER_TOKEN: &str = "X_BEARER_TOKEN";
pub const ENV_GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsProvider {
    #[serde(alias = "newsapi")]
    NewsApi,
    GoogleRss,
}

impl FromStr for NewsProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newsapi" | "news_api" => Ok(Self::NewsApi),
            "google_rss" | "google" | "rss" => Ok(Self::GoogleRss),
            other => bail!("unsupported news provider: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechProvider {
    GoogleTranslate,
    #[serde(alias = "openai")]
    OpenAi,
}

impl FromStr for SpeechProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google_translate" | "google" | "gtts" => Ok(Self::GoogleTranslate),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            other => bail!("unsupported speech provider: {other}"),
        }
    }
}

/// Limits and timeouts applied by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub prompt_budget_chars: usize,
    pub per_topic_chars: usize,
    pub max_topics: usize,
    pub fetch_timeout: Duration,
    pub summarize_timeout: Duration,
    pub speech_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            prompt_budget_chars: 12_000,
            per_topic_chars: 4_000,
            max_topics: 5,
            fetch_timeout: Duration::from_secs(10),
            summarize_timeout: Duration::from_secs(60),
            speech_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub provider: NewsProvider,
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_items: usize,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct SocialConfig {
    pub bearer_token: String,
    pub base_url: String,
    pub max_items: usize,
}

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub provider: SpeechProvider,
    pub lang: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub voice: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub news: NewsConfig,
    pub social: SocialConfig,
    pub summarizer: SummarizerConfig,
    pub speech: SpeechConfig,
    pub pipeline: PipelineSettings,
    pub static_dir: PathBuf,
}

// ---- optional TOML file (non-secret settings only) ----

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub pipeline: FilePipeline,
    #[serde(default)]
    pub news: FileNews,
    #[serde(default)]
    pub social: FileSocial,
    #[serde(default)]
    pub summarizer: FileSummarizer,
    #[serde(default)]
    pub speech: FileSpeech,
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilePipeline {
    pub prompt_budget_chars: Option<usize>,
    pub per_topic_chars: Option<usize>,
    pub max_topics: Option<usize>,
    pub fetch_timeout_secs: Option<u64>,
    pub summarize_timeout_secs: Option<u64>,
    pub speech_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileNews {
    pub provider: Option<NewsProvider>,
    pub base_url: Option<String>,
    pub max_items: Option<usize>,
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSocial {
    pub base_url: Option<String>,
    pub max_items: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSummarizer {
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSpeech {
    pub provider: Option<SpeechProvider>,
    pub lang: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
    pub voice: Option<String>,
}

impl FileConfig {
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing newscast config toml")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::parse(&content)
    }

    /// 1) $NEWSCAST_CONFIG_PATH (must exist)
    /// 2) config/newscast.toml if present
    /// 3) nothing
    pub fn load_default() -> Result<Option<Self>> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb).map(Some);
        }
        let p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from(&p).map(Some);
        }
        Ok(None)
    }
}

impl AppConfig {
    /// Load from the process environment plus the optional config file.
    pub fn load() -> Result<Self> {
        let file = FileConfig::load_default()?.unwrap_or_default();
        Self::resolve(file, |k| std::env::var(k).ok())
    }

    /// Build the config from a parsed file and an environment lookup.
    pub fn resolve<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |k: &str| env(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            prompt_budget_chars: parse_env(&var, "PROMPT_BUDGET_CHARS")?
                .or(file.pipeline.prompt_budget_chars)
                .unwrap_or(defaults.prompt_budget_chars),
            per_topic_chars: parse_env(&var, "PER_TOPIC_CHARS")?
                .or(file.pipeline.per_topic_chars)
                .unwrap_or(defaults.per_topic_chars),
            max_topics: parse_env(&var, "MAX_TOPICS")?
                .or(file.pipeline.max_topics)
                .unwrap_or(defaults.max_topics),
            fetch_timeout: secs(
                parse_env(&var, "FETCH_TIMEOUT_SECS")?.or(file.pipeline.fetch_timeout_secs),
                defaults.fetch_timeout,
            ),
            summarize_timeout: secs(
                parse_env(&var, "SUMMARIZE_TIMEOUT_SECS")?
                    .or(file.pipeline.summarize_timeout_secs),
                defaults.summarize_timeout,
            ),
            speech_timeout: secs(
                parse_env(&var, "SPEECH_TIMEOUT_SECS")?.or(file.pipeline.speech_timeout_secs),
                defaults.speech_timeout,
            ),
        };
        if pipeline.prompt_budget_chars == 0 || pipeline.per_topic_chars == 0 {
            bail!("prompt budget and per-topic cap must be greater than zero");
        }
        if pipeline.max_topics == 0 {
            bail!("MAX_TOPICS must be at least 1");
        }

        let news_provider: NewsProvider = match var("NEWS_PROVIDER") {
            Some(v) => v.parse()?,
            None => file.news.provider.unwrap_or(NewsProvider::NewsApi),
        };
        let news_api_key = var(ENV_NEWS_API_KEY);
        if news_provider == NewsProvider::NewsApi && news_api_key.is_none() {
            bail!("Missing {ENV_NEWS_API_KEY} env var (required by the newsapi provider)");
        }
        let news = NewsConfig {
            provider: news_provider,
            api_key: news_api_key,
            base_url: var("NEWS_BASE_URL")
                .or(file.news.base_url)
                .unwrap_or_else(|| match news_provider {
                    NewsProvider::NewsApi => "https://newsapi.org/v2".to_string(),
                    NewsProvider::GoogleRss => "https://news.google.com/rss".to_string(),
                }),
            max_items: parse_env(&var, "NEWS_MAX_ITEMS")?
                .or(file.news.max_items)
                .unwrap_or(5),
            language: var("NEWS_LANGUAGE")
                .or(file.news.language)
                .unwrap_or_else(|| "en".to_string()),
        };

        let social = SocialConfig {
            bearer_token: var(ENV_X_BEARER_TOKEN)
                .ok_or_else(|| anyhow!("Missing {ENV_X_BEARER_TOKEN} env var"))?,
            base_url: var("X_BASE_URL")
                .or(file.social.base_url)
                .unwrap_or_else(|| "https://api.twitter.com/2".to_string()),
            // recent search accepts 10..=100
            max_items: parse_env(&var, "SOCIAL_MAX_ITEMS")?
                .or(file.social.max_items)
                .unwrap_or(15)
                .clamp(10, 100),
        };

        let summarizer = SummarizerConfig {
            api_key: var(ENV_GROQ_API_KEY)
                .ok_or_else(|| anyhow!("Missing {ENV_GROQ_API_KEY} env var"))?,
            base_url: var("SUMMARIZER_BASE_URL")
                .or(file.summarizer.base_url)
                .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string()),
            model: var("SUMMARIZER_MODEL")
                .or(file.summarizer.model)
                .unwrap_or_else(|| "llama-3.3-70b-versatile".to_string()),
        };

        let speech_provider: SpeechProvider = match var("SPEECH_PROVIDER") {
            Some(v) => v.parse()?,
            None => file.speech.provider.unwrap_or(SpeechProvider::GoogleTranslate),
        };
        let openai_api_key = var(ENV_OPENAI_API_KEY);
        if speech_provider == SpeechProvider::OpenAi && openai_api_key.is_none() {
            bail!("Missing {ENV_OPENAI_API_KEY} env var (required by the openai speech provider)");
        }
        let speech = SpeechConfig {
            provider: speech_provider,
            lang: var("SPEECH_LANG")
                .or(file.speech.lang)
                .unwrap_or_else(|| "en".to_string()),
            openai_api_key,
            openai_base_url: var("OPENAI_BASE_URL")
                .or(file.speech.openai_base_url)
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            openai_model: var("OPENAI_TTS_MODEL")
                .or(file.speech.openai_model)
                .unwrap_or_else(|| "tts-1".to_string()),
            voice: var("OPENAI_TTS_VOICE")
                .or(file.speech.voice)
                .unwrap_or_else(|| "alloy".to_string()),
        };

        let static_dir = var("STATIC_DIR")
            .map(PathBuf::from)
            .or(file.static_dir)
            .unwrap_or_else(|| PathBuf::from("static"));

        Ok(Self {
            news,
            social,
            summarizer,
            speech,
            pipeline,
            static_dir,
        })
    }
}

fn parse_env<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid value for {key}='{raw}': {e}")),
        None => Ok(None),
    }
}

fn secs(v: Option<u64>, default: Duration) -> Duration {
    match v {
        Some(0) | None => default,
        Some(s) => Duration::from_secs(s),
    }
}
