// src/speech/google_translate.rs
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;

use super::{chunk_text, clean_for_speech, AudioClip, SpeechError, SpeechSynthesizer};
use crate::sources::USER_AGENT;

/// Google Translate's TTS endpoint caps each request at 100 characters.
pub const MAX_CHUNK_CHARS: usize = 100;
const IN_FLIGHT: usize = 4;

/// Keyless Google Translate speech. Long text is split into chunks whose MP3
/// segments are concatenated in order (MP3 frames play back-to-back).
pub struct GoogleTranslateTts {
    http: Client,
    base_url: String,
    lang: String,
}

impl GoogleTranslateTts {
    pub fn new(lang: &str, timeout: Duration) -> Result<Self, SpeechError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: "https://translate.google.com".into(),
            lang: lang.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize) -> Result<Vec<u8>, SpeechError> {
        let idx_s = idx.to_string();
        let total_s = total.to_string();
        let len_s = chunk.chars().count().to_string();

        let resp = self
            .http
            .get(format!("{}/translate_tts", self.base_url))
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", self.lang.as_str()),
                ("client", "tw-ob"),
                ("ttsspeed", "1"),
                ("total", total_s.as_str()),
                ("idx", idx_s.as_str()),
                ("textlen", len_s.as_str()),
            ])
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, idx, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(SpeechError::Api { status, message });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    #[tracing::instrument(skip_all, fields(lang = %self.lang))]
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError> {
        let spoken = clean_for_speech(text);
        let chunks = chunk_text(&spoken, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SpeechError::EmptyInput);
        }
        let total = chunks.len();
        tracing::debug!(chunks = total, "synthesizing");

        let calls: Vec<_> = chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| self.fetch_chunk(chunk, idx, total))
            .collect();

        // `buffered` keeps segment order while allowing a few requests in flight
        let segments: Vec<Vec<u8>> = futures::stream::iter(calls)
            .buffered(IN_FLIGHT)
            .try_collect()
            .await?;

        let bytes = segments.concat();
        if bytes.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(AudioClip::mp3(bytes))
    }

    fn name(&self) -> &'static str {
        "google_translate"
    }
}
