//! ragam-id - Raga identification service
//!
//! Upload a clip to `POST /upload`; the service identifies the song and
//! answers with its Carnatic raga as scraped from the target site.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use ragam_id::config::ServiceConfig;
use ragam_id::services::{AcrCloudClient, HttpRenderer, RagaPipeline, ScratchDir, SerpApiClient};
use ragam_id::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Config file first: it carries the log level
    let toml_config = ragam_common::config::load_default_toml_config()?;
    ragam_common::logging::init_tracing(&toml_config.logging.level)?;

    info!("Starting ragam-id (Raga identification) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Missing credentials stop startup here, not per request
    let config = ServiceConfig::resolve(&toml_config)?;
    info!(
        acr_host = %config.acr.host,
        target_domain = %config.target_domain,
        scratch_dir = %config.scratch_dir.display(),
        static_dir = ?config.static_dir,
        max_upload_bytes = config.max_upload_bytes,
        "Configuration resolved"
    );

    let scratch = ScratchDir::new(&config.scratch_dir);
    scratch.ensure_exists().await?;

    let identifier = AcrCloudClient::new(config.acr.clone())?;
    let search = SerpApiClient::new(config.serpapi.clone())?;
    let pipeline = RagaPipeline::new(
        Arc::new(identifier),
        Arc::new(search),
        Arc::new(HttpRenderer::default()),
        config.target_domain.clone(),
    );

    let state = AppState::new(pipeline, scratch)
        .with_max_upload_bytes(config.max_upload_bytes)
        .with_static_dir(config.static_dir.clone());
    let app = build_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server running at http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}
