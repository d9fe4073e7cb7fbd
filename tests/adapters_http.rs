// tests/adapters_http.rs
//
// Real HTTP adapters against a local axum server on 127.0.0.1:0.
//
// Covered:
// - Google Translate TTS: chunking, ordered MP3 concatenation, empty input/audio, upstream errors
// - OpenAI speech: request shape, 4096-char input cap, empty audio
// - NewsAPI / X / Google RSS fetch: request parameters, auth headers, 429 -> RateLimited

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use newscast::request::Source;
use newscast::sources::{
    ContentSource, GoogleNewsRssSource, NewsApiSource, SourceError, XRecentSearchSource,
};
use newscast::speech::{
    chunk_text, clean_for_speech, GoogleTranslateTts, OpenAiSpeech, SpeechError,
    SpeechSynthesizer,
};

const TIMEOUT: Duration = Duration::from_secs(5);

type Seen<T> = Arc<Mutex<Vec<T>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

// ---------- Google Translate TTS ----------

#[derive(Debug, Clone, Deserialize)]
struct TtsQuery {
    q: String,
    tl: String,
    client: String,
    idx: usize,
    total: usize,
}

async fn tts_segment(State(seen): State<Seen<TtsQuery>>, Query(q): Query<TtsQuery>) -> Vec<u8> {
    seen.lock().unwrap().push(q.clone());
    // later chunks answer first; output order must still follow idx
    let wait = (q.total - q.idx) as u64 * 15;
    tokio::time::sleep(Duration::from_millis(wait)).await;
    format!("[seg{}]", q.idx).into_bytes()
}

#[tokio::test]
async fn google_tts_concatenates_segments_in_chunk_order() {
    let seen: Seen<TtsQuery> = Arc::default();
    let base = serve(
        Router::new()
            .route("/translate_tts", get(tts_segment))
            .with_state(seen.clone()),
    )
    .await;

    let summary = (1..=8)
        .map(|i| format!("- Point {i}: markets moved as regulators met with chip makers today"))
        .collect::<Vec<_>>()
        .join("\n");
    let expected_chunks = chunk_text(&clean_for_speech(&summary), 100).len();
    assert!(expected_chunks > 4, "needs more chunks than requests in flight");

    let tts = GoogleTranslateTts::new("en", TIMEOUT)
        .unwrap()
        .with_base_url(&base);
    let clip = tts.synthesize(&summary).await.expect("synthesized");

    let expected: String = (0..expected_chunks).map(|i| format!("[seg{i}]")).collect();
    assert_eq!(String::from_utf8(clip.bytes).unwrap(), expected);
    assert_eq!(clip.mime, "audio/mpeg");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), expected_chunks);
    assert!(seen.iter().all(|q| q.q.chars().count() <= 100));
    assert!(seen.iter().all(|q| q.tl == "en" && q.client == "tw-ob"));
    // bullet markers are not read aloud
    assert!(seen.iter().all(|q| !q.q.contains("- Point")));
}

#[tokio::test]
async fn google_tts_rejects_markup_only_text_without_calling_out() {
    let seen: Seen<TtsQuery> = Arc::default();
    let base = serve(
        Router::new()
            .route("/translate_tts", get(tts_segment))
            .with_state(seen.clone()),
    )
    .await;

    let tts = GoogleTranslateTts::new("en", TIMEOUT)
        .unwrap()
        .with_base_url(&base);
    let err = tts.synthesize("  **  \n ## ").await.unwrap_err();
    assert!(matches!(err, SpeechError::EmptyInput), "{err:?}");
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn google_tts_empty_audio_and_upstream_errors() {
    let base = serve(Router::new().route("/translate_tts", get(|| async { Vec::<u8>::new() }))).await;
    let tts = GoogleTranslateTts::new("en", TIMEOUT)
        .unwrap()
        .with_base_url(&base);
    let err = tts.synthesize("Short summary.").await.unwrap_err();
    assert!(matches!(err, SpeechError::EmptyAudio), "{err:?}");

    let base = serve(Router::new().route(
        "/translate_tts",
        get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    ))
    .await;
    let tts = GoogleTranslateTts::new("en", TIMEOUT)
        .unwrap()
        .with_base_url(&base);
    match tts.synthesize("Short summary.").await.unwrap_err() {
        SpeechError::Api { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "slow down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ---------- OpenAI speech ----------

async fn openai_speech(
    State(seen): State<Seen<(String, Value)>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Vec<u8> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    seen.lock().unwrap().push((auth, body));
    b"ID3\x04\x00openai".to_vec()
}

#[tokio::test]
async fn openai_speech_caps_input_and_sends_voice() {
    let seen: Seen<(String, Value)> = Arc::default();
    let base = serve(
        Router::new()
            .route("/audio/speech", post(openai_speech))
            .with_state(seen.clone()),
    )
    .await;

    let speech = OpenAiSpeech::new("sk-test", TIMEOUT)
        .unwrap()
        .with_base_url(&base)
        .with_voice("nova");
    let clip = speech.synthesize(&"a".repeat(5_000)).await.expect("synthesized");
    assert_eq!(clip.bytes, b"ID3\x04\x00openai".to_vec());
    assert_eq!(clip.mime, "audio/mpeg");

    let seen = seen.lock().unwrap();
    let (auth, body) = &seen[0];
    assert_eq!(auth, "Bearer sk-test");
    assert_eq!(body["model"], "tts-1");
    assert_eq!(body["voice"], "nova");
    assert_eq!(body["response_format"], "mp3");
    assert_eq!(body["input"].as_str().unwrap().chars().count(), 4096);
}

#[tokio::test]
async fn openai_speech_empty_input_and_empty_audio() {
    let base = serve(Router::new().route("/audio/speech", post(|| async { Vec::<u8>::new() }))).await;
    let speech = OpenAiSpeech::new("sk-test", TIMEOUT)
        .unwrap()
        .with_base_url(&base);

    let err = speech.synthesize("   ").await.unwrap_err();
    assert!(matches!(err, SpeechError::EmptyInput), "{err:?}");

    let err = speech.synthesize("- one point").await.unwrap_err();
    assert!(matches!(err, SpeechError::EmptyAudio), "{err:?}");
}

// ---------- content sources ----------

const NEWSAPI_BODY: &str = r#"{"status":"ok","totalResults":1,"articles":[
    {"title":"AI chip demand surges","description":"Suppliers expand.","url":"https://example.test/a","publishedAt":"2024-05-01T10:00:00Z"}
]}"#;

async fn newsapi_everything(
    State(seen): State<Seen<(String, HashMap<String, String>)>>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    seen.lock().unwrap().push((key, q));
    ([(header::CONTENT_TYPE, "application/json")], NEWSAPI_BODY)
}

#[tokio::test]
async fn newsapi_fetch_sends_key_and_query() {
    let seen: Seen<(String, HashMap<String, String>)> = Arc::default();
    let base = serve(
        Router::new()
            .route("/everything", get(newsapi_everything))
            .with_state(seen.clone()),
    )
    .await;

    let src = NewsApiSource::new("news-key", TIMEOUT)
        .unwrap()
        .with_base_url(&base)
        .with_page_size(3);
    let items = src.fetch("AI").await.expect("fetched");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].text, "AI chip demand surges. Suppliers expand.");
    assert_eq!(items[0].source, Source::News);

    let seen = seen.lock().unwrap();
    let (key, q) = &seen[0];
    assert_eq!(key, "news-key");
    assert_eq!(q["q"], "AI");
    assert_eq!(q["pageSize"], "3");
    assert_eq!(q["sortBy"], "publishedAt");
    assert_eq!(q["language"], "en");
}

#[tokio::test]
async fn rate_limit_maps_to_rate_limited_with_retry_after() {
    let base = serve(Router::new().route(
        "/everything",
        get(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, "7")],
                "too many requests",
            )
        }),
    ))
    .await;

    let src = NewsApiSource::new("k", TIMEOUT).unwrap().with_base_url(&base);
    let err = src.fetch("AI").await.unwrap_err();
    assert!(
        matches!(err, SourceError::RateLimited { retry_after: Some(7) }),
        "{err:?}"
    );
}

#[tokio::test]
async fn other_http_errors_keep_status_and_body() {
    let base = serve(Router::new().route(
        "/tweets/search/recent",
        get(|| async { (StatusCode::UNAUTHORIZED, "Unauthorized") }),
    ))
    .await;

    let src = XRecentSearchSource::new("bad-token", TIMEOUT)
        .unwrap()
        .with_base_url(&base);
    match src.fetch("AI").await.unwrap_err() {
        SourceError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Unauthorized");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

async fn x_recent(
    State(seen): State<Seen<(String, HashMap<String, String>)>>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    seen.lock().unwrap().push((auth, q));
    Json(serde_json::json!({
        "data": [{"id": "42", "text": "Heat records fall again", "created_at": "2024-05-01T10:00:00.000Z"}],
        "meta": {"result_count": 1}
    }))
}

#[tokio::test]
async fn x_fetch_sends_bearer_and_quoted_query() {
    let seen: Seen<(String, HashMap<String, String>)> = Arc::default();
    let base = serve(
        Router::new()
            .route("/tweets/search/recent", get(x_recent))
            .with_state(seen.clone()),
    )
    .await;

    let src = XRecentSearchSource::new("x-token", TIMEOUT)
        .unwrap()
        .with_base_url(&base)
        .with_max_results(5);
    let items = src.fetch("climate change").await.expect("fetched");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].source, Source::Social);
    assert_eq!(items[0].text, "Heat records fall again");

    let seen = seen.lock().unwrap();
    let (auth, q) = &seen[0];
    assert_eq!(auth, "Bearer x-token");
    assert_eq!(q["query"], "\"climate change\" -is:retweet lang:en");
    assert_eq!(q["max_results"], "10");
    assert_eq!(q["tweet.fields"], "created_at");
}

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>AI - Google News</title>
  <item><title>Chip exports tighten - Outlet</title><link>https://news.example/c</link>
    <pubDate>Wed, 01 May 2024 10:00:00 GMT</pubDate></item>
</channel></rss>"#;

#[tokio::test]
async fn google_rss_fetch_sends_locale_params() {
    let seen: Seen<HashMap<String, String>> = Arc::default();
    let base = serve(
        Router::new()
            .route(
                "/search",
                get(
                    |State(seen): State<Seen<HashMap<String, String>>>,
                     Query(q): Query<HashMap<String, String>>| async move {
                        seen.lock().unwrap().push(q);
                        ([(header::CONTENT_TYPE, "application/rss+xml")], FEED)
                    },
                ),
            )
            .with_state(seen.clone()),
    )
    .await;

    let src = GoogleNewsRssSource::new(TIMEOUT)
        .unwrap()
        .with_base_url(&base);
    let items = src.fetch("AI").await.expect("fetched");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].text, "Chip exports tighten - Outlet");

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0]["q"], "AI");
    assert_eq!(seen[0]["hl"], "en-US");
    assert_eq!(seen[0]["gl"], "US");
    assert_eq!(seen[0]["ceid"], "US:en");
}
