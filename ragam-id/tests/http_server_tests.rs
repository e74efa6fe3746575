//! HTTP Server & Routing Integration Tests

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use helpers::*;
use ragam_id::services::{RagaPipeline, ScratchDir};
use ragam_id::{build_router, AppState};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn test_root_is_liveness_text() {
    let app = happy_app();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let (status, text) = response_text(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Raga Recognition Server is running.");
}

#[tokio::test]
async fn test_health_reports_module_and_version() {
    let app = happy_app();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let (status, body) = response_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "ragam-id");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_upload_requires_post() {
    let app = happy_app();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/upload").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_route_without_static_dir_is_404() {
    let app = happy_app();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_front_end_is_served() {
    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(static_dir.path().join("index.html"), "<h1>Raga finder</h1>").unwrap();
    let scratch_dir = tempfile::tempdir().unwrap();

    let pipeline = RagaPipeline::new(
        Arc::new(FakeIdentifier::new(IdentifyBehavior::NoMatch)),
        Arc::new(FakeSearch::links(vec![])),
        Arc::new(FakeRenderer::text("")),
        TARGET_DOMAIN,
    );
    let state = AppState::new(pipeline, ScratchDir::new(scratch_dir.path()))
        .with_static_dir(Some(static_dir.path().to_path_buf()));
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let (status, text) = response_text(response).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("Raga finder"));

    // `/` stays the liveness route even with a front-end present
    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let (_, text) = response_text(response).await;
    assert_eq!(text, "Raga Recognition Server is running.");
}

#[tokio::test]
async fn test_upload_over_body_limit_is_rejected_without_external_calls() {
    let scratch_dir = tempfile::tempdir().unwrap();
    let identifier = Arc::new(FakeIdentifier::new(IdentifyBehavior::Match("Nagumomu")));

    let pipeline = RagaPipeline::new(
        identifier.clone(),
        Arc::new(FakeSearch::links(vec![])),
        Arc::new(FakeRenderer::text("")),
        TARGET_DOMAIN,
    );
    let state = AppState::new(pipeline, ScratchDir::new(scratch_dir.path())).with_max_upload_bytes(64);
    let router = build_router(state);

    let response = router.oneshot(audio_upload(&[0u8; 1024])).await.unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(identifier.calls(), 0);
    assert!(scratch_entries(scratch_dir.path()).is_empty());
}
