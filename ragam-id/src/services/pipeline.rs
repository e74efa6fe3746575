//! Identify-then-enrich pipeline
//!
//! `Received → Identifying → Searching → Scraping → Done`; any stage may end
//! the run with a [`PipelineError`]. Stages run strictly in sequence and each
//! makes exactly one external call.

use super::acrcloud_client::DEFAULT_CONTENT_TYPE;
use super::page_scraper::{scrape_raga, RagaFinding, ScrapeError, SharedRenderer};
use super::raga_resolver::RagaResolver;
use super::scratch::ScratchFile;
use super::{AudioSample, IdentifyError, TrackIdentifier, WebSearch};
use crate::error::PipelineError;
use futures::FutureExt;
use serde::Serialize;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `raga` value when the page loads but has no raga line
pub const RAGA_NOT_FOUND: &str = "Raga not found";

/// `raga` value when the first search result is not on the target domain
pub const NO_CANDIDATE: &str = "No relevant Carnatik raagam found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Identifying,
    Searching,
    Scraping,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Identifying => "identifying",
            PipelineStage::Searching => "searching",
            PipelineStage::Scraping => "scraping",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Response body of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    pub title: String,
    pub raga: String,
}

pub struct RagaPipeline {
    identifier: Arc<dyn TrackIdentifier>,
    resolver: RagaResolver,
    renderer: SharedRenderer,
}

/// Declared audio/video types pass through; anything else is sent as audio/mpeg
fn sample_content_type(declared: Option<&str>) -> String {
    match declared.map(str::trim) {
        Some(ct) if ct.starts_with("audio/") || ct.starts_with("video/") => ct.to_string(),
        _ => DEFAULT_CONTENT_TYPE.to_string(),
    }
}

impl RagaPipeline {
    pub fn new(
        identifier: Arc<dyn TrackIdentifier>,
        search: Arc<dyn WebSearch>,
        renderer: SharedRenderer,
        target_domain: impl Into<String>,
    ) -> Self {
        Self {
            identifier,
            resolver: RagaResolver::new(search, target_domain),
            renderer,
        }
    }

    pub fn target_domain(&self) -> &str {
        self.resolver.target_domain()
    }

    /// Run the pipeline and remove the upload afterwards, on every path.
    /// A panic inside a stage becomes [`PipelineError::Internal`].
    pub async fn process(&self, upload: ScratchFile) -> Result<PipelineOutcome, PipelineError> {
        let outcome = AssertUnwindSafe(self.run(&upload)).catch_unwind().await;

        let scratch_id = upload.id().to_string();
        if let Err(e) = upload.discard().await {
            warn!(scratch_id = %scratch_id, error = %e, "Failed to remove scratch file");
        }

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(scratch_id = %scratch_id, "Pipeline panicked");
                Err(PipelineError::Internal("pipeline panicked".to_string()))
            }
        }
    }

    /// Run all stages against an upload. Does not remove it.
    pub async fn run(&self, upload: &ScratchFile) -> Result<PipelineOutcome, PipelineError> {
        let mut stage = PipelineStage::Received;
        let result = self.run_stages(upload, &mut stage).await;

        match &result {
            Ok(outcome) => info!(
                title = %outcome.title,
                raga = %outcome.raga,
                "Pipeline done"
            ),
            Err(e) => warn!(
                stage = %stage,
                kind = e.kind(),
                error = %e,
                "Pipeline failed"
            ),
        }
        result
    }

    async fn run_stages(
        &self,
        upload: &ScratchFile,
        stage: &mut PipelineStage,
    ) -> Result<PipelineOutcome, PipelineError> {
        enter(stage, PipelineStage::Identifying);
        let title = self.identify(upload).await?;

        enter(stage, PipelineStage::Searching);
        let raga = match self.resolver.resolve(&title).await {
            Ok(hit) => {
                enter(stage, PipelineStage::Scraping);
                match self.scrape(&hit.link).await? {
                    RagaFinding::Found(line) => line,
                    RagaFinding::NotFound => RAGA_NOT_FOUND.to_string(),
                }
            }
            Err(PipelineError::NoCandidate) => NO_CANDIDATE.to_string(),
            Err(e) => return Err(e),
        };

        enter(stage, PipelineStage::Done);
        Ok(PipelineOutcome { title, raga })
    }

    /// Fingerprint the upload and return the matched title
    pub async fn identify(&self, upload: &ScratchFile) -> Result<String, PipelineError> {
        let sample = AudioSample {
            bytes: upload.read().await?,
            file_name: upload.id().to_string(),
            content_type: sample_content_type(upload.content_type()),
        };

        let result = self.identifier.identify(&sample).await.map_err(|e| {
            warn!(source = self.identifier.source_id(), error = %e, "Identification call failed");
            match e {
                IdentifyError::Network(msg) => PipelineError::Network(msg),
                other => PipelineError::IdentificationFailed(other.to_string()),
            }
        })?;

        match result.matched_title() {
            Some(title) => Ok(title.trim().to_string()),
            None => Err(PipelineError::IdentificationFailed(format!(
                "status {} ({})",
                result.status_code, result.status_message
            ))),
        }
    }

    /// Scrape the candidate page for its raga line
    pub async fn scrape(&self, url: &str) -> Result<RagaFinding, PipelineError> {
        scrape_raga(self.renderer.as_ref(), url).await.map_err(|e| {
            warn!(renderer = self.renderer.source_id(), url = %url, error = %e, "Scrape failed");
            match e {
                ScrapeError::Navigation(msg) | ScrapeError::Render(msg) => {
                    PipelineError::ScrapeFailed(msg)
                }
                ScrapeError::Status(code) => PipelineError::ScrapeFailed(format!("HTTP {}", code)),
            }
        })
    }
}

fn enter(stage: &mut PipelineStage, next: PipelineStage) {
    debug!(from = %stage, to = %next, "Pipeline stage");
    *stage = next;
}
