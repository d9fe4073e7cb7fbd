// src/speech/mod.rs
//! Text-to-speech capability and adapters.

pub mod google_translate;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::{AppConfig, SpeechProvider};

pub use google_translate::GoogleTranslateTts;
pub use openai::OpenAiSpeech;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("nothing to synthesize")]
    EmptyInput,
    #[error("synthesizer returned no audio")]
    EmptyAudio,
}

/// Encoded audio returned by a synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl AudioClip {
    pub fn mp3(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: "audio/mpeg".to_string(),
        }
    }
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError>;
    fn name(&self) -> &'static str;
}

pub type DynSpeech = Arc<dyn SpeechSynthesizer>;

/// Strip markdown markers so they are not read aloud; one bullet per sentence.
pub fn clean_for_speech(text: &str) -> String {
    static RE_BULLET: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\s*(?:[-*+•·]|\d+[.)])\s+").expect("valid bullet regex"));
    static RE_MARKS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[*_#`>]+").expect("valid marks regex"));

    let mut out = Vec::new();
    for line in text.lines() {
        let line = RE_BULLET.replace(line, "");
        let line = RE_MARKS.replace_all(&line, "");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.ends_with(['.', '!', '?', ':', ';']) {
            out.push(line.to_string());
        } else {
            out.push(format!("{line}."));
        }
    }
    out.join(" ")
}

/// Split `text` into pieces of at most `max_chars` characters, preferring sentence
/// ends, then word boundaries; a single overlong word is cut hard.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { word_len + 1 };
        if current_len + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;

        // close the chunk at a sentence end once it is reasonably full
        if word.ends_with(['.', '!', '?']) && current_len * 2 >= max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Build the synthesizer named by the config.
pub fn build_speech(cfg: &AppConfig) -> anyhow::Result<DynSpeech> {
    let timeout = cfg.pipeline.speech_timeout;
    let speech: DynSpeech = match cfg.speech.provider {
        SpeechProvider::GoogleTranslate => {
            Arc::new(GoogleTranslateTts::new(&cfg.speech.lang, timeout)?)
        }
        SpeechProvider::OpenAi => {
            let key = cfg
                .speech
                .openai_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("openai speech provider needs OPENAI_API_KEY"))?;
            Arc::new(
                OpenAiSpeech::new(key, timeout)?
                    .with_base_url(&cfg.speech.openai_base_url)
                    .with_model(&cfg.speech.openai_model)
                    .with_voice(&cfg.speech.voice),
            )
        }
    };
    tracing::info!(speech = speech.name(), "speech synthesizer ready");
    Ok(speech)
}
