//! Test Helper Utilities
//!
//! Fake collaborators with call counters, a router builder over a temporary
//! scratch directory, and multipart request construction.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use ragam_id::services::{
    AudioSample, IdentificationResult, IdentifyError, PageRenderer, RagaPipeline, RenderSession,
    ScrapeError, ScratchDir, SearchError, SearchHit, TrackIdentifier, WebSearch,
};
use ragam_id::{build_router, AppState};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const BOUNDARY: &str = "ragam-test-boundary";
pub const TARGET_DOMAIN: &str = "karnatik.com";

// ============================================================================
// Fake fingerprint provider
// ============================================================================

#[derive(Clone)]
pub enum IdentifyBehavior {
    Match(&'static str),
    NoMatch,
    Network,
    Panic,
}

pub struct FakeIdentifier {
    behavior: IdentifyBehavior,
    calls: AtomicUsize,
    samples: Mutex<Vec<AudioSample>>,
}

impl FakeIdentifier {
    pub fn new(behavior: IdentifyBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            samples: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn samples(&self) -> Vec<AudioSample> {
        self.samples.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackIdentifier for FakeIdentifier {
    fn source_id(&self) -> &'static str {
        "fake-identifier"
    }

    async fn identify(&self, sample: &AudioSample) -> Result<IdentificationResult, IdentifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.samples.lock().unwrap().push(sample.clone());

        match &self.behavior {
            IdentifyBehavior::Match(title) => Ok(IdentificationResult {
                status_code: 0,
                status_message: "Success".to_string(),
                title: Some(title.to_string()),
            }),
            IdentifyBehavior::NoMatch => Ok(IdentificationResult {
                status_code: 1001,
                status_message: "No result".to_string(),
                title: None,
            }),
            IdentifyBehavior::Network => {
                Err(IdentifyError::Network("connection refused".to_string()))
            }
            IdentifyBehavior::Panic => panic!("identifier exploded"),
        }
    }
}

// ============================================================================
// Fake search provider
// ============================================================================

pub enum SearchBehavior {
    Links(Vec<&'static str>),
    ProviderError,
}

pub struct FakeSearch {
    behavior: SearchBehavior,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn new(behavior: SearchBehavior) -> Self {
        Self {
            behavior,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn links(links: Vec<&'static str>) -> Self {
        Self::new(SearchBehavior::Links(links))
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for FakeSearch {
    fn source_id(&self) -> &'static str {
        "fake-search"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.behavior {
            SearchBehavior::Links(links) => Ok(links.iter().map(|l| SearchHit::new(*l)).collect()),
            SearchBehavior::ProviderError => {
                Err(SearchError::Provider("Your account has run out of searches.".to_string()))
            }
        }
    }
}

// ============================================================================
// Fake renderer with live-session accounting
// ============================================================================

#[derive(Clone)]
pub enum RenderBehavior {
    Text(&'static str),
    Fail,
    Panic,
}

pub struct FakeRenderer {
    behavior: RenderBehavior,
    launches: AtomicUsize,
    live: Arc<AtomicUsize>,
    urls: Arc<Mutex<Vec<String>>>,
}

impl FakeRenderer {
    pub fn new(behavior: RenderBehavior) -> Self {
        Self {
            behavior,
            launches: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
            urls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn text(text: &'static str) -> Self {
        Self::new(RenderBehavior::Text(text))
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Sessions launched but not closed
    pub fn live_sessions(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

struct FakeSession {
    behavior: RenderBehavior,
    live: Arc<AtomicUsize>,
    urls: Arc<Mutex<Vec<String>>>,
    open: bool,
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    fn source_id(&self) -> &'static str {
        "fake-renderer"
    }

    async fn launch(&self) -> Result<Box<dyn RenderSession>, ScrapeError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            behavior: self.behavior.clone(),
            live: self.live.clone(),
            urls: self.urls.clone(),
            open: true,
        }))
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn body_text(&mut self, url: &str) -> Result<String, ScrapeError> {
        self.urls.lock().unwrap().push(url.to_string());
        match &self.behavior {
            RenderBehavior::Text(text) => Ok(text.to_string()),
            RenderBehavior::Fail => Err(ScrapeError::Navigation("net::ERR_NAME_NOT_RESOLVED".to_string())),
            RenderBehavior::Panic => panic!("renderer crashed"),
        }
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

// ============================================================================
// App construction
// ============================================================================

pub struct TestApp {
    pub router: Router,
    pub scratch_dir: TempDir,
    pub identifier: Arc<FakeIdentifier>,
    pub search: Arc<FakeSearch>,
    pub renderer: Arc<FakeRenderer>,
}

impl TestApp {
    pub fn scratch_path(&self) -> &Path {
        self.scratch_dir.path()
    }
}

pub fn test_app(identifier: FakeIdentifier, search: FakeSearch, renderer: FakeRenderer) -> TestApp {
    let scratch_dir = tempfile::tempdir().unwrap();
    let identifier = Arc::new(identifier);
    let search = Arc::new(search);
    let renderer = Arc::new(renderer);

    let pipeline = RagaPipeline::new(
        identifier.clone(),
        search.clone(),
        renderer.clone(),
        TARGET_DOMAIN,
    );
    let state = AppState::new(pipeline, ScratchDir::new(scratch_dir.path()));

    TestApp {
        router: build_router(state),
        scratch_dir,
        identifier,
        search,
        renderer,
    }
}

/// Happy-path collaborators
pub fn happy_app() -> TestApp {
    test_app(
        FakeIdentifier::new(IdentifyBehavior::Match("Vatapi Ganapatim")),
        FakeSearch::links(vec!["https://www.karnatik.com/c1058.shtml"]),
        FakeRenderer::text("Vatapi Ganapatim\nRagam : Hamsadhwani\nTalam: Adi"),
    )
}

// ============================================================================
// Requests and responses
// ============================================================================

/// One multipart part: field name, optional file name, optional content type, payload
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{}\"", file_name));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// POST /upload with a single `audio` part
pub fn audio_upload(data: &[u8]) -> Request<Body> {
    multipart_request(&[Part {
        name: "audio",
        file_name: Some("clip.mp3"),
        content_type: Some("audio/mpeg"),
        data,
    }])
}

pub async fn response_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn response_text(response: Response<Body>) -> (StatusCode, String) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&bytes).to_string())
}

/// Files currently in the scratch directory
pub fn scratch_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    entries.sort();
    entries
}
