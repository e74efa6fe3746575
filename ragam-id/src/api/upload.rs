//! POST /upload: receive an audio clip and run the raga pipeline on it

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{ApiResult, PipelineError};
use crate::services::{PipelineOutcome, ScratchDir, ScratchFile};
use crate::AppState;

/// Multipart field carrying the clip
pub const AUDIO_FIELD: &str = "audio";

/// POST /upload
///
/// 200 `{title, raga}`; 400/500 `{error, kind}`. The scratch copy of the
/// upload is gone by the time the response is built.
pub async fn upload_audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<PipelineOutcome>> {
    let request_id = Uuid::new_v4();

    async move {
        let upload = receive_audio(&state.scratch, multipart).await?;
        info!(
            scratch_id = %upload.id(),
            bytes = upload.len(),
            file_name = ?upload.original_name(),
            content_type = ?upload.content_type(),
            "Audio received"
        );

        let outcome = state.pipeline.process(upload).await?;
        Ok(Json(outcome))
    }
    .instrument(info_span!("upload", %request_id))
    .await
}

/// Find the `audio` file part and persist it. A plain form value named
/// `audio` (no filename) is not a file. Nothing external is called here.
async fn receive_audio(
    scratch: &ScratchDir,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ScratchFile, PipelineError> {
    let mut multipart = multipart.map_err(|e| {
        debug!(error = %e, "Request is not multipart");
        PipelineError::MissingInput
    })?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!(error = %e, "Malformed multipart body");
        PipelineError::MissingInput
    })? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let Some(original_name) = field.file_name().map(str::to_string) else {
            debug!("Ignoring `audio` form value without a filename");
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            warn!(error = %e, "Failed to read audio field");
            PipelineError::MissingInput
        })?;

        return Ok(scratch.store(&bytes, content_type, Some(original_name)).await?);
    }

    Err(PipelineError::MissingInput)
}

/// Build upload routes with the given body limit
pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_audio))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
