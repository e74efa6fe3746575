//! Error types for ragam-id
//!
//! Every pipeline stage converts its collaborator failures into one of these
//! kinds. Provider error text is kept for logging only; the HTTP body carries a
//! fixed message per kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::pipeline::NO_CANDIDATE;

/// Pipeline failure taxonomy
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No `audio` field in the upload (400)
    #[error("No audio file uploaded")]
    MissingInput,

    /// Transport failure talking to a collaborator (500)
    #[error("Network error: {0}")]
    Network(String),

    /// Fingerprint provider answered but did not match the sample (400)
    #[error("Identification failed: {0}")]
    IdentificationFailed(String),

    /// Search provider reported an error (500)
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// Search succeeded but the first result is not on the target domain
    #[error("No on-domain search result")]
    NoCandidate,

    /// Page could not be loaded or rendered (500)
    #[error("Scrape failed: {0}")]
    ScrapeFailed(String),

    /// Anything unexpected: scratch I/O, a panicking stage (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable tag reported as `kind` in error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MissingInput => "MissingInput",
            PipelineError::Network(_) => "NetworkError",
            PipelineError::IdentificationFailed(_) => "IdentificationFailed",
            PipelineError::SearchFailed(_) => "SearchFailed",
            PipelineError::NoCandidate => "NoCandidate",
            PipelineError::ScrapeFailed(_) => "ScrapeFailed",
            PipelineError::Internal(_) => "Internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::MissingInput | PipelineError::IdentificationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-visible message. Never includes provider output.
    pub fn public_message(&self) -> &'static str {
        match self {
            PipelineError::MissingInput => "No audio file uploaded",
            PipelineError::IdentificationFailed(_) => "Could not identify song",
            PipelineError::Network(_) => "Audio recognition error",
            PipelineError::SearchFailed(_) => "Raga lookup failed",
            // The pipeline answers this one with a 200 and a raga message
            PipelineError::NoCandidate => NO_CANDIDATE,
            PipelineError::ScrapeFailed(_) => "Raga page could not be loaded",
            PipelineError::Internal(_) => "Internal server error",
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Internal(format!("scratch storage: {}", err))
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.public_message(),
            "kind": self.kind(),
        }));

        (self.status_code(), body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, PipelineError>;
