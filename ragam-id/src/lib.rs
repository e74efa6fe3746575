//! ragam-id library interface
//!
//! Identifies an uploaded clip with a fingerprint provider, finds its page on
//! the target site through a site-restricted search, and scrapes the raga
//! from that page.

pub mod api;
pub mod config;
pub mod error;
pub mod services;

pub use crate::error::{ApiResult, PipelineError};

use axum::Router;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::services::{RagaPipeline, ScratchDir};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Identify-then-enrich pipeline (immutable, shared by all requests)
    pub pipeline: Arc<RagaPipeline>,
    /// Where uploads are held while a request runs
    pub scratch: ScratchDir,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    pub max_upload_bytes: usize,
    /// Front-end files served for unmatched paths
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(pipeline: RagaPipeline, scratch: ScratchDir) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            scratch,
            startup_time: Utc::now(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            static_dir: None,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_static_dir(mut self, static_dir: Option<PathBuf>) -> Self {
        self.static_dir = static_dir;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();

    let router = Router::new()
        .merge(api::health_routes())
        .merge(api::upload_routes(state.max_upload_bytes))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}
