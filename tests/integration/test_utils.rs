//! Test utilities for integration tests.
//!
//! Provides a configurable stub volume source for driving the router
//! without a network, RLE payload builders, and an in-process mock DVID
//! server for exercising the real client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;

use dvid_meshgen::source::rle::encode_spans;
use dvid_meshgen::{
    Box3, CoarseExtent, RleSpan, SourceContext, SourceError, VolumeMask, VolumeSource,
};

// =============================================================================
// RLE Builders
// =============================================================================

/// Spans for a solid cube of the given extent at the queried level.
pub fn solid_cube_spans(extent: i32) -> Vec<RleSpan> {
    let mut spans = Vec::new();
    for z in 0..extent {
        for y in 0..extent {
            spans.push(RleSpan {
                x: 0,
                y,
                z,
                run: extent,
            });
        }
    }
    spans
}

/// Encode spans into a DVID sparse-volume payload.
pub fn rle_payload(spans: &[RleSpan]) -> Vec<u8> {
    encode_spans(spans)
}

// =============================================================================
// Stub Volume Source
// =============================================================================

/// A mesh write recorded by the stub source.
#[derive(Debug, Clone)]
pub struct StoredMesh {
    pub store: String,
    pub key: String,
    pub bytes: Bytes,
}

/// A stub source serving fixed coarse spans and a fixed fine mask.
///
/// Records every stored mesh so tests can assert on the storage
/// interaction.
#[derive(Clone)]
pub struct StubSource {
    coarse_spans: Vec<RleSpan>,
    mask_extent: usize,
    stored: Arc<Mutex<Vec<StoredMesh>>>,
}

impl StubSource {
    /// Object whose coarse extent is a solid cube of `coarse_extent`
    /// voxels per axis, with a solid `mask_extent` cube as its fine mask.
    pub fn new(coarse_extent: i32, mask_extent: usize) -> Self {
        Self {
            coarse_spans: solid_cube_spans(coarse_extent),
            mask_extent,
            stored: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Object with zero occupied voxels.
    pub fn empty() -> Self {
        Self {
            coarse_spans: Vec::new(),
            mask_extent: 0,
            stored: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn stored(&self) -> Vec<StoredMesh> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl VolumeSource for StubSource {
    async fn latest_version(&self, _ctx: &SourceContext) -> Result<String, SourceError> {
        Ok("abc123".to_string())
    }

    async fn coarse_extent(
        &self,
        _ctx: &SourceContext,
        _version: &str,
        _segmentation: &str,
        _body: u64,
    ) -> Result<CoarseExtent, SourceError> {
        Ok(CoarseExtent::new(self.coarse_spans.clone()))
    }

    async fn fetch_mask(
        &self,
        _ctx: &SourceContext,
        _version: &str,
        _segmentation: &str,
        _body: u64,
        _level: u8,
    ) -> Result<VolumeMask, SourceError> {
        let e = self.mask_extent;
        let bounds = Box3::new([0, 0, 0], [e as i64; 3]);
        Ok(VolumeMask::new(vec![true; e * e * e], bounds))
    }

    async fn store_mesh(
        &self,
        _ctx: &SourceContext,
        _version: &str,
        store: &str,
        key: &str,
        bytes: Bytes,
    ) -> Result<(), SourceError> {
        self.stored.lock().unwrap().push(StoredMesh {
            store: store.to_string(),
            key: key.to_string(),
            bytes,
        });
        Ok(())
    }
}

// =============================================================================
// Mock DVID Server
// =============================================================================

/// One call recorded by the mock DVID server.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
}

/// Shared state of the mock DVID server.
#[derive(Clone)]
pub struct MockDvid {
    pub repos_json: String,
    pub coarse_payload: Vec<u8>,
    pub fine_payload: Vec<u8>,
    pub fail_with: Option<StatusCode>,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
    pub posted: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockDvid {
    pub fn new() -> Self {
        let repos_json = r#"{
            "repo1": {"DAG": {"Nodes": {
                "aaa111": {"UUID": "aaa111", "Branch": "", "VersionID": 1, "Locked": true},
                "bbb222": {"UUID": "bbb222", "Branch": "", "VersionID": 2, "Locked": false},
                "ccc333": {"UUID": "ccc333", "Branch": "side", "VersionID": 3}
            }}}
        }"#
        .to_string();

        Self {
            repos_json,
            coarse_payload: rle_payload(&solid_cube_spans(2)),
            fine_payload: rle_payload(&solid_cube_spans(4)),
            fail_with: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            posted: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn failing(status: StatusCode) -> Self {
        Self {
            fail_with: Some(status),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn posted(&self) -> HashMap<String, Vec<u8>> {
        self.posted.lock().unwrap().clone()
    }
}

async fn mock_dvid_handler(State(state): State<MockDvid>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or("").to_string();
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    state.calls.lock().unwrap().push(RecordedCall {
        method: method.clone(),
        path: path.clone(),
        query,
        authorization,
    });

    if let Some(status) = state.fail_with {
        return status.into_response();
    }

    if path == "/api/repos/info" {
        return (
            [(header::CONTENT_TYPE, "application/json")],
            state.repos_json.clone(),
        )
            .into_response();
    }
    if path.contains("/sparsevol-coarse/") {
        return state.coarse_payload.clone().into_response();
    }
    if path.contains("/sparsevol/") {
        return state.fine_payload.clone().into_response();
    }
    if method == Method::POST && path.contains("/key/") {
        let body = request
            .into_body()
            .collect()
            .await
            .map(|b| b.to_bytes().to_vec())
            .unwrap_or_default();
        state.posted.lock().unwrap().insert(path, body);
        return StatusCode::OK.into_response();
    }

    StatusCode::NOT_FOUND.into_response()
}

/// Spawn the mock server on an ephemeral port; returns its base address
/// as `host:port` (no scheme, exercising client normalization).
pub async fn spawn_mock_dvid(state: MockDvid) -> String {
    let router = Router::new()
        .fallback(any(mock_dvid_handler))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock DVID");
    let addr = listener.local_addr().expect("mock DVID addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve mock DVID");
    });
    format!("127.0.0.1:{}", addr.port())
}

/// Collect a response body as bytes.
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}
