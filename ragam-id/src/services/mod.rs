//! Pipeline services
//!
//! The three collaborators (fingerprint provider, web search, page renderer)
//! sit behind traits so the orchestrator can be driven by fakes in tests.

pub mod acrcloud_client;
pub mod page_scraper;
pub mod pipeline;
pub mod raga_resolver;
pub mod scratch;
pub mod serpapi_client;

pub use acrcloud_client::{AcrCloudClient, AcrCloudConfig};
pub use page_scraper::{HttpRenderer, PageRenderer, RagaFinding, RenderSession, ScrapeError};
pub use pipeline::{PipelineOutcome, PipelineStage, RagaPipeline};
pub use raga_resolver::RagaResolver;
pub use scratch::{ScratchDir, ScratchFile};
pub use serpapi_client::{SerpApiClient, SerpApiConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Audio handed to the fingerprint provider
#[derive(Debug, Clone)]
pub struct AudioSample {
    pub bytes: Vec<u8>,
    /// Name sent with the multipart part (the scratch token)
    pub file_name: String,
    pub content_type: String,
}

/// Provider verdict for one sample. Not retried, not cached.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentificationResult {
    /// Provider status code; 0 means success
    pub status_code: i64,
    pub status_message: String,
    /// Title of the best match, when there is one
    pub title: Option<String>,
}

impl IdentificationResult {
    /// Matched title, only when the provider reported success
    pub fn matched_title(&self) -> Option<&str> {
        if self.status_code != 0 {
            return None;
        }
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Fingerprint provider errors
#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One organic search result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub link: String,
    /// Host of `link`, when it parses as a URL
    pub domain: Option<String>,
}

impl SearchHit {
    pub fn new(link: impl Into<String>) -> Self {
        let link = link.into();
        let domain = reqwest::Url::parse(&link)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()));
        Self { link, domain }
    }
}

/// Search provider errors
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Provider answered with an `error` field
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Acoustic fingerprint lookup
#[async_trait]
pub trait TrackIdentifier: Send + Sync {
    /// Provider identifier for logs (e.g. "ACRCloud")
    fn source_id(&self) -> &'static str;

    /// Submit one sample. A single attempt; callers never retry.
    async fn identify(&self, sample: &AudioSample) -> Result<IdentificationResult, IdentifyError>;
}

/// Web search returning organic results in rank order
#[async_trait]
pub trait WebSearch: Send + Sync {
    fn source_id(&self) -> &'static str;

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}
