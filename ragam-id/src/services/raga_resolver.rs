//! Raga page lookup: site-restricted search, first result only

use super::{SearchError, SearchHit, WebSearch};
use crate::error::PipelineError;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_TARGET_DOMAIN: &str = "karnatik.com";

/// `"<title> site:<domain>"`
pub fn build_query(title: &str, target_domain: &str) -> String {
    format!("{} site:{}", title.trim(), target_domain)
}

/// The first hit, if and only if its link contains the target domain.
/// Later hits are never consulted.
pub fn select_candidate<'a>(hits: &'a [SearchHit], target_domain: &str) -> Option<&'a SearchHit> {
    hits.first().filter(|hit| hit.link.contains(target_domain))
}

pub struct RagaResolver {
    search: Arc<dyn WebSearch>,
    target_domain: String,
}

impl RagaResolver {
    pub fn new(search: Arc<dyn WebSearch>, target_domain: impl Into<String>) -> Self {
        Self {
            search,
            target_domain: target_domain.into(),
        }
    }

    pub fn target_domain(&self) -> &str {
        &self.target_domain
    }

    /// Find the candidate page for a track title
    pub async fn resolve(&self, title: &str) -> Result<SearchHit, PipelineError> {
        let query = build_query(title, &self.target_domain);

        let hits = self.search.search(&query).await.map_err(|e| {
            warn!(source = self.search.source_id(), error = %e, "Search failed");
            match e {
                SearchError::Network(msg) => PipelineError::Network(msg),
                other => PipelineError::SearchFailed(other.to_string()),
            }
        })?;

        match select_candidate(&hits, &self.target_domain) {
            Some(hit) => {
                info!(link = %hit.link, "Candidate raga page found");
                Ok(hit.clone())
            }
            None => {
                info!(
                    results = hits.len(),
                    first = ?hits.first().map(|h| h.link.as_str()),
                    "No on-domain candidate"
                );
                Err(PipelineError::NoCandidate)
            }
        }
    }
}
