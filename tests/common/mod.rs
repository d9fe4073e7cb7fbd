// tests/common/mod.rs
//
// Deterministic collaborators with call recording, shared by the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use newscast::config::PipelineSettings;
use newscast::request::{FetchedItem, Source};
use newscast::sources::{ContentSource, SourceError};
use newscast::speech::{AudioClip, SpeechError, SpeechSynthesizer};
use newscast::summarize::{SummarizeError, Summarizer};
use newscast::SummaryOrchestrator;

type Responder = Box<dyn Fn(&str) -> Result<Vec<String>, String> + Send + Sync>;

pub struct FakeSource {
    kind: Source,
    respond: Responder,
    delay: Option<Duration>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with<F>(kind: Source, f: F) -> Arc<Self>
    where
        F: Fn(&str) -> Result<Vec<String>, String> + Send + Sync + 'static,
    {
        Arc::new(Self {
            kind,
            respond: Box::new(f),
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Returns `n` items per topic: "<kind> item <i> about <topic>".
    pub fn ok(kind: Source, n: usize) -> Arc<Self> {
        Self::with(kind, move |topic| {
            Ok((1..=n)
                .map(|i| format!("{kind} item {i} about {topic}"))
                .collect())
        })
    }

    pub fn failing(kind: Source) -> Arc<Self> {
        Self::with(kind, |_| Err("upstream 503".to_string()))
    }

    /// Never answers within any sane timeout.
    pub fn hanging(kind: Source) -> Arc<Self> {
        Arc::new(Self {
            kind,
            respond: Box::new(|_| Ok(vec!["too late".to_string()])),
            delay: Some(Duration::from_secs(3600)),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn topics_called(&self) -> Vec<String> {
        let mut v = self.calls.lock().unwrap().clone();
        v.sort();
        v
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn fetch(&self, topic: &str) -> Result<Vec<FetchedItem>, SourceError> {
        self.calls.lock().unwrap().push(topic.to_string());
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        match (self.respond)(topic) {
            Ok(texts) => Ok(texts
                .into_iter()
                .map(|t| FetchedItem::new(self.kind, topic, t))
                .collect()),
            Err(message) => Err(SourceError::Api {
                status: 503,
                message,
            }),
        }
    }

    fn name(&self) -> &'static str {
        match self.kind {
            Source::News => "fake-news",
            Source::Social => "fake-social",
        }
    }
}

pub struct FakeSummarizer {
    reply: Result<String, String>,
    pub bodies: Mutex<Vec<String>>,
}

impl FakeSummarizer {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            bodies: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err("rate limited".to_string()),
            bodies: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.bodies.lock().unwrap().len()
    }

    pub fn last_body(&self) -> String {
        self.bodies.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, _instruction: &str, body: &str) -> Result<String, SummarizeError> {
        self.bodies.lock().unwrap().push(body.to_string());
        match &self.reply {
            Ok(t) => Ok(t.clone()),
            Err(m) => Err(SummarizeError::Api {
                status: 429,
                message: m.clone(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "fake-summarizer"
    }
}

pub struct FakeSpeech {
    fail: bool,
    pub texts: Mutex<Vec<String>>,
}

impl FakeSpeech {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.texts.lock().unwrap().len()
    }

    pub fn last_text(&self) -> String {
        self.texts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

/// Bytes every successful fake synthesis returns ("ID3" tag header).
pub const FAKE_MP3: &[u8] = b"ID3\x04\x00fake-mp3";

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(SpeechError::Api {
                status: 400,
                message: "unsupported characters".into(),
            });
        }
        Ok(AudioClip::mp3(FAKE_MP3.to_vec()))
    }

    fn name(&self) -> &'static str {
        "fake-speech"
    }
}

pub struct Fakes {
    pub news: Arc<FakeSource>,
    pub social: Arc<FakeSource>,
    pub summarizer: Arc<FakeSummarizer>,
    pub speech: Arc<FakeSpeech>,
}

impl Fakes {
    pub fn happy() -> Self {
        Self {
            news: FakeSource::ok(Source::News, 3),
            social: FakeSource::ok(Source::Social, 2),
            summarizer: FakeSummarizer::replying("- point one\n- point two"),
            speech: FakeSpeech::ok(),
        }
    }

    pub fn orchestrator(&self, settings: PipelineSettings) -> SummaryOrchestrator {
        SummaryOrchestrator::new(
            settings,
            self.news.clone(),
            self.social.clone(),
            self.summarizer.clone(),
            self.speech.clone(),
        )
    }

    pub fn external_calls(&self) -> usize {
        self.news.call_count()
            + self.social.call_count()
            + self.summarizer.call_count()
            + self.speech.call_count()
    }
}
