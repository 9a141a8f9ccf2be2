//! API integration tests for the mesh endpoint and error handling.
//!
//! Tests verify:
//! - Parameter validation (missing/invalid parameters name the parameter)
//! - Mesh bytes and diagnostic headers on success
//! - Level selection and decimation arithmetic end to end
//! - Storage interaction (same bytes stored and returned)

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use dvid_meshgen::{
    create_router, MeshPipeline, NativeMesher, PipelineLimits, RouterConfig,
};

use super::test_utils::{body_bytes, StubSource};

fn router(source: StubSource, limits: PipelineLimits) -> axum::Router {
    let pipeline = MeshPipeline::new(source, NativeMesher::new(), limits);
    create_router(pipeline, RouterConfig::new().with_tracing(false))
}

fn default_router(source: StubSource) -> axum::Router {
    router(source, PipelineLimits::default())
}

// =============================================================================
// Parameter Validation
// =============================================================================

#[tokio::test]
async fn test_missing_body_names_parameter() {
    let response = default_router(StubSource::new(2, 2))
        .oneshot(
            Request::builder()
                .uri("/?dvid=http://dvid.test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_bytes(response).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert!(text.contains("body"), "400 body must name the parameter: {text}");
}

#[tokio::test]
async fn test_missing_dvid_names_parameter() {
    let response = default_router(StubSource::new(2, 2))
        .oneshot(
            Request::builder()
                .uri("/?body=42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_bytes(response).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("dvid"));
}

#[tokio::test]
async fn test_non_numeric_body_rejected() {
    let response = default_router(StubSource::new(2, 2))
        .oneshot(
            Request::builder()
                .uri("/?dvid=http://dvid.test&body=notanumber")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_bytes(response).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("body"));
}

#[tokio::test]
async fn test_out_of_range_decimation_rejected() {
    let response = default_router(StubSource::new(2, 2))
        .oneshot(
            Request::builder()
                .uri("/?dvid=http://dvid.test&body=42&decimation=1.5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_bytes(response).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("decimation"));
}

#[tokio::test]
async fn test_scale_above_max_level_rejected() {
    let response = default_router(StubSource::new(2, 2))
        .oneshot(
            Request::builder()
                .uri("/?dvid=http://dvid.test&body=42&scale=12")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_bytes(response).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("scale"));
}

// =============================================================================
// Successful Generation
// =============================================================================

#[tokio::test]
async fn test_mesh_generation_success() {
    let source = StubSource::new(2, 3);
    let response = default_router(source.clone())
        .oneshot(
            Request::builder()
                .uri("/?dvid=http://dvid.test&body=42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );

    // 2x2x2 coarse voxels -> 128^3 full-res, under budget, floored at 1.
    assert_eq!(response.headers().get("x-mesh-level").unwrap(), "1");
    assert_eq!(response.headers().get("x-mesh-decimation").unwrap(), "0.1");
    let triangles: usize = response
        .headers()
        .get("x-mesh-triangles")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(triangles > 0);

    // Body is a well-formed ngmesh stream.
    let body = body_bytes(response).await;
    let vertex_count = u32::from_le_bytes(body[..4].try_into().unwrap()) as usize;
    assert_eq!(body.len(), 4 + 12 * vertex_count + 12 * triangles);

    // The same bytes were stored under the body-derived key.
    let stored = source.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].store, "segmentation_meshes");
    assert_eq!(stored[0].key, "42.ngmesh");
    assert_eq!(stored[0].bytes, body);
}

#[tokio::test]
async fn test_explicit_scale_override() {
    let response = default_router(StubSource::new(2, 3))
        .oneshot(
            Request::builder()
                .uri("/?dvid=http://dvid.test&body=42&scale=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-mesh-level").unwrap(), "0");
}

#[tokio::test]
async fn test_large_object_compensates_decimation() {
    // 64^3 coarse voxels -> 4096^3 full-res -> level 3, decimation
    // 0.1 * 4^2 = 1.6 clamped to 1.
    let response = default_router(StubSource::new(64, 3))
        .oneshot(
            Request::builder()
                .uri("/?dvid=http://dvid.test&body=42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-mesh-level").unwrap(), "3");
    assert_eq!(response.headers().get("x-mesh-decimation").unwrap(), "1");
}

#[tokio::test]
async fn test_custom_mesh_store_name() {
    let source = StubSource::new(2, 2);
    let response = default_router(source.clone())
        .oneshot(
            Request::builder()
                .uri("/?dvid=http://dvid.test&body=7&segmentation=groundtruth")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stored = source.stored();
    assert_eq!(stored[0].store, "groundtruth_meshes");
    assert_eq!(stored[0].key, "7.ngmesh");
}

// =============================================================================
// Pipeline Failures Through the Router
// =============================================================================

#[tokio::test]
async fn test_empty_object_maps_to_404() {
    let response = default_router(StubSource::empty())
        .oneshot(
            Request::builder()
                .uri("/?dvid=http://dvid.test&body=42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_bytes(response).await;
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "empty_object");
    assert!(error["message"].as_str().unwrap().contains("42"));
}

#[tokio::test]
async fn test_oversized_box_maps_to_500_naming_level() {
    // A budget so small that even max_level cannot fit the object.
    let limits = PipelineLimits {
        max_box_voxels: 8,
        max_level: 2,
        ..PipelineLimits::default()
    };
    let response = router(StubSource::new(64, 2), limits)
        .oneshot(
            Request::builder()
                .uri("/?dvid=http://dvid.test&body=42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_bytes(response).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert!(text.contains("level"), "500 body must name the level: {text}");
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let response = default_router(StubSource::new(2, 2))
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
}
