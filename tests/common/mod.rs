//! Shared test utilities
//!
//! Relay endpoint stubs, a hardware-free recording sink, and image fixtures.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use rand::Rng;
use serde_json::json;

use story_reader::audio::{AudioResource, AudioSink, PlaybackStart, PlaybackStatus};
use story_reader::{Config, Result};

/// What the stubbed extraction endpoint replies
pub enum ExtractReply {
    Text(String),
    Status(u16),
}

/// What the stubbed synthesis endpoint replies
pub enum SynthReply {
    Audio(Vec<u8>),
    Status(u16),
}

/// A stub relay recording what it saw
pub struct Relay {
    pub extract: ExtractReply,
    pub synth: SynthReply,
    pub extract_hits: AtomicUsize,
    pub synth_hits: AtomicUsize,
    pub health_hits: AtomicUsize,
    /// Decoded size of the last uploaded image payload
    pub last_image_bytes: AtomicUsize,
    /// Text body of the last synthesis request
    pub last_text: Mutex<String>,
}

impl Relay {
    pub fn new(extract: ExtractReply, synth: SynthReply) -> Self {
        Self {
            extract,
            synth,
            extract_hits: AtomicUsize::new(0),
            synth_hits: AtomicUsize::new(0),
            health_hits: AtomicUsize::new(0),
            last_image_bytes: AtomicUsize::new(0),
            last_text: Mutex::new(String::new()),
        }
    }

    /// Happy path: fixed text plus a small audio payload
    pub fn happy(text: &str) -> Self {
        Self::new(
            ExtractReply::Text(text.to_string()),
            SynthReply::Audio(vec![0xAA; 2048]),
        )
    }
}

async fn extract_handler(
    State(relay): State<Arc<Relay>>,
    Json(req): Json<serde_json::Value>,
) -> Response {
    relay.extract_hits.fetch_add(1, Ordering::SeqCst);

    let image = req.get("image").and_then(|v| v.as_str()).unwrap_or_default();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(image)
        .unwrap_or_default();
    relay.last_image_bytes.store(decoded.len(), Ordering::SeqCst);

    match &relay.extract {
        ExtractReply::Text(text) => (StatusCode::OK, Json(json!({ "text": text }))).into_response(),
        ExtractReply::Status(code) => (
            StatusCode::from_u16(*code).unwrap(),
            Json(json!({ "error": "Failed to extract text from image" })),
        )
            .into_response(),
    }
}

async fn synth_handler(
    State(relay): State<Arc<Relay>>,
    Json(req): Json<serde_json::Value>,
) -> Response {
    relay.synth_hits.fetch_add(1, Ordering::SeqCst);

    let text = req.get("text").and_then(|v| v.as_str()).unwrap_or_default();
    *relay.last_text.lock().unwrap() = text.to_string();

    match &relay.synth {
        SynthReply::Audio(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "audio/mpeg")],
            bytes.clone(),
        )
            .into_response(),
        SynthReply::Status(code) => (
            StatusCode::from_u16(*code).unwrap(),
            Json(json!({ "error": "Failed to generate audio" })),
        )
            .into_response(),
    }
}

async fn health_handler(State(relay): State<Arc<Relay>>) -> Json<serde_json::Value> {
    relay.health_hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "status": "OK" }))
}

/// Serve a stub relay on an ephemeral port; returns its base URL
pub async fn spawn_relay(relay: Relay) -> (String, Arc<Relay>) {
    let state = Arc::new(relay);

    let app = Router::new()
        .route("/api/extract-text", post(extract_handler))
        .route("/api/generate-audio", post(synth_handler))
        .route("/health", get(health_handler))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind relay stub");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("relay stub died");
    });

    (format!("http://{addr}"), state)
}

/// Sink call counters, shared with the test after the sink moves into the
/// session
#[derive(Debug, Default)]
pub struct SinkStats {
    pub attaches: usize,
    pub releases: usize,
    pub live: usize,
    pub max_live: usize,
}

/// Hardware-free sink that records the resource lifecycle
pub struct RecordingSink {
    blocked: bool,
    status: PlaybackStatus,
    stats: Arc<Mutex<SinkStats>>,
}

impl RecordingSink {
    pub fn new(blocked: bool) -> (Self, Arc<Mutex<SinkStats>>) {
        let stats = Arc::new(Mutex::new(SinkStats::default()));
        (
            Self {
                blocked,
                status: PlaybackStatus::Idle,
                stats: Arc::clone(&stats),
            },
            stats,
        )
    }
}

impl AudioSink for RecordingSink {
    fn attach(&mut self, _resource: AudioResource) -> Result<PlaybackStart> {
        let mut stats = self.stats.lock().unwrap();
        if stats.live > 0 {
            stats.live -= 1;
            stats.releases += 1;
        }
        stats.attaches += 1;
        stats.live += 1;
        stats.max_live = stats.max_live.max(stats.live);
        drop(stats);

        if self.blocked {
            self.status = PlaybackStatus::Paused;
            Ok(PlaybackStart::Blocked)
        } else {
            self.status = PlaybackStatus::Playing;
            Ok(PlaybackStart::Started)
        }
    }

    fn play(&mut self) -> Result<()> {
        self.status = PlaybackStatus::Playing;
        Ok(())
    }

    fn pause(&mut self) {
        self.status = PlaybackStatus::Paused;
    }

    fn stop(&mut self) {
        let mut stats = self.stats.lock().unwrap();
        if stats.live > 0 {
            stats.live -= 1;
            stats.releases += 1;
        }
        self.status = PlaybackStatus::Idle;
    }

    fn status(&self) -> PlaybackStatus {
        if self.stats.lock().unwrap().live == 0 {
            PlaybackStatus::Idle
        } else {
            self.status
        }
    }
}

/// A test config pointed at the stub relay, tuned for fast runs
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.endpoints.base_url = base_url.to_string();
    config.capture.prefer_camera = false;
    // Generous window so back-to-back triggers land inside it
    config.session.debounce = std::time::Duration::from_secs(60);
    config
}

/// Write a small solid-color JPEG page fixture; keep the tempdir alive
pub fn small_page() -> (tempfile::TempDir, PathBuf) {
    write_jpeg(
        image::RgbImage::from_pixel(640, 480, image::Rgb([230, 220, 200])),
        80,
    )
}

/// Write a multi-megabyte JPEG: random noise barely compresses
pub fn oversized_page() -> (tempfile::TempDir, PathBuf) {
    let mut rng = rand::thread_rng();
    let img = image::RgbImage::from_fn(3000, 2400, |_, _| {
        image::Rgb([rng.r#gen(), rng.r#gen(), rng.r#gen()])
    });
    write_jpeg(img, 95)
}

fn write_jpeg(img: image::RgbImage, quality: u8) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.jpg");

    let mut cursor = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
    image::DynamicImage::ImageRgb8(img)
        .write_with_encoder(encoder)
        .unwrap();
    std::fs::write(&path, cursor.into_inner()).unwrap();

    (dir, path)
}
