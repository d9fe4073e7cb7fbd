// src/speech/openai.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{clean_for_speech, AudioClip, SpeechError, SpeechSynthesizer};
use crate::sources::USER_AGENT;

/// OpenAI `/audio/speech` rejects inputs above 4096 characters.
pub const MAX_INPUT_CHARS: usize = 4096;

pub struct OpenAiSpeech {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    voice: String,
}

#[derive(Serialize)]
struct SpeechReq<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

impl OpenAiSpeech {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, SpeechError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".into(),
            model: "tts-1".into(),
            voice: "alloy".into(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    #[tracing::instrument(skip_all, fields(model = %self.model, voice = %self.voice))]
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError> {
        let spoken = clean_for_speech(text);
        if spoken.is_empty() {
            return Err(SpeechError::EmptyInput);
        }
        let input: String = spoken.chars().take(MAX_INPUT_CHARS).collect();
        if input.len() < spoken.len() {
            tracing::warn!(
                chars = spoken.chars().count(),
                "summary longer than speech input limit; tail dropped"
            );
        }

        let resp = self
            .http
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&SpeechReq {
                model: &self.model,
                input: &input,
                voice: &self.voice,
                response_format: "mp3",
            })
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(SpeechError::Api { status, message });
        }

        let bytes = resp.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(AudioClip::mp3(bytes))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
