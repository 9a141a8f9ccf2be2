//! DVID client tests against an in-process mock server.
//!
//! Tests verify:
//! - URL shapes for every endpoint the client touches
//! - The `u` / `app` auditing query parameters on every call
//! - Authorization header forwarding
//! - RLE decoding of real HTTP payloads
//! - Error mapping for upstream failures

use axum::http::{Method, StatusCode};

use dvid_meshgen::source::dvid::APP_NAME;
use dvid_meshgen::{DvidClient, SourceContext, SourceError, VolumeSource};

use super::test_utils::{spawn_mock_dvid, MockDvid};

fn client() -> DvidClient {
    DvidClient::new(reqwest::Client::new())
}

fn ctx(server: String) -> SourceContext {
    SourceContext {
        server,
        user: "alice".to_string(),
        authorization: None,
    }
}

#[tokio::test]
async fn test_latest_version_resolves_master_tip() {
    let mock = MockDvid::new();
    let server = spawn_mock_dvid(mock.clone()).await;

    let version = client().latest_version(&ctx(server)).await.unwrap();
    assert_eq!(version, "bbb222");

    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "/api/repos/info");
}

#[tokio::test]
async fn test_audit_params_on_every_call() {
    let mock = MockDvid::new();
    let server = spawn_mock_dvid(mock.clone()).await;
    let ctx = ctx(server);
    let c = client();

    c.latest_version(&ctx).await.unwrap();
    c.coarse_extent(&ctx, "bbb222", "segmentation", 42)
        .await
        .unwrap();

    for call in mock.calls() {
        assert!(call.query.contains("u=alice"), "missing user in {}", call.query);
        assert!(
            call.query.contains(&format!("app={APP_NAME}")),
            "missing app in {}",
            call.query
        );
    }
}

#[tokio::test]
async fn test_coarse_extent_url_and_decoding() {
    let mock = MockDvid::new();
    let server = spawn_mock_dvid(mock.clone()).await;

    let extent = client()
        .coarse_extent(&ctx(server), "bbb222", "segmentation", 42)
        .await
        .unwrap();

    // Mock serves a solid 2x2x2 cube of spans.
    let bounds = extent.bounding_box().unwrap();
    assert_eq!(bounds.min, [0, 0, 0]);
    assert_eq!(bounds.max, [2, 2, 2]);

    let calls = mock.calls();
    assert_eq!(
        calls[0].path,
        "/api/node/bbb222/segmentation/sparsevol-coarse/42"
    );
}

#[tokio::test]
async fn test_fetch_mask_url_carries_scale() {
    let mock = MockDvid::new();
    let server = spawn_mock_dvid(mock.clone()).await;

    let mask = client()
        .fetch_mask(&ctx(server), "bbb222", "segmentation", 42, 3)
        .await
        .unwrap();

    // Mock serves a solid 4x4x4 cube for the fine query.
    assert_eq!(mask.dims(), [4, 4, 4]);
    assert_eq!(mask.occupied_count(), 64);

    let calls = mock.calls();
    assert_eq!(calls[0].path, "/api/node/bbb222/segmentation/sparsevol/42");
    assert!(calls[0].query.contains("scale=3"));
}

#[tokio::test]
async fn test_store_mesh_posts_raw_bytes() {
    let mock = MockDvid::new();
    let server = spawn_mock_dvid(mock.clone()).await;

    client()
        .store_mesh(
            &ctx(server),
            "bbb222",
            "segmentation_meshes",
            "42.ngmesh",
            bytes::Bytes::from_static(b"mesh-bytes"),
        )
        .await
        .unwrap();

    let calls = mock.calls();
    assert_eq!(calls[0].method, Method::POST);
    assert_eq!(
        calls[0].path,
        "/api/node/bbb222/segmentation_meshes/key/42.ngmesh"
    );
    let posted = mock.posted();
    assert_eq!(
        posted.get("/api/node/bbb222/segmentation_meshes/key/42.ngmesh"),
        Some(&b"mesh-bytes".to_vec())
    );
}

#[tokio::test]
async fn test_authorization_forwarded() {
    let mock = MockDvid::new();
    let server = spawn_mock_dvid(mock.clone()).await;

    let mut ctx = ctx(server);
    ctx.authorization = Some("Bearer secret-token".to_string());

    let c = client();
    c.latest_version(&ctx).await.unwrap();
    c.store_mesh(
        &ctx,
        "bbb222",
        "segmentation_meshes",
        "42.ngmesh",
        bytes::Bytes::new(),
    )
    .await
    .unwrap();

    for call in mock.calls() {
        assert_eq!(call.authorization.as_deref(), Some("Bearer secret-token"));
    }
}

#[tokio::test]
async fn test_upstream_failure_maps_to_status_error() {
    let mock = MockDvid::failing(StatusCode::SERVICE_UNAVAILABLE);
    let server = spawn_mock_dvid(mock).await;

    let err = client()
        .coarse_extent(&ctx(server), "bbb222", "segmentation", 42)
        .await
        .unwrap_err();

    match err {
        SourceError::Status { status, url } => {
            assert_eq!(status, 503);
            assert!(url.contains("/sparsevol-coarse/42"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_server_maps_to_transport_error() {
    // Nothing listens here; connection is refused immediately.
    let err = client()
        .latest_version(&ctx("127.0.0.1:1".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Http(_)));
}

#[tokio::test]
async fn test_garbage_rle_payload_maps_to_decode_error() {
    let mut mock = MockDvid::new();
    mock.coarse_payload = vec![9, 9, 9]; // bad descriptor, too short
    let server = spawn_mock_dvid(mock).await;

    let err = client()
        .coarse_extent(&ctx(server), "bbb222", "segmentation", 42)
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Decode(_)));
}
