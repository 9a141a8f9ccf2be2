//! HTTP request handlers for the mesh generation API.
//!
//! # Endpoints
//!
//! - `GET /` - Generate, store, and return a mesh for one labeled object
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::PipelineError;
use crate::mesh::MeshEngine;
use crate::pipeline::{MeshPipeline, MeshRequest, UNKNOWN_USER};
use crate::source::VolumeSource;

/// Default segmentation instance name.
pub const DEFAULT_SEGMENTATION: &str = "segmentation";

/// Default smoothing rounds during mesh construction.
pub const DEFAULT_SMOOTHING: u32 = 2;

/// Default base decimation fraction, before level compensation.
pub const DEFAULT_DECIMATION: f64 = 0.1;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the mesh pipeline.
///
/// Handlers share one pipeline; all per-request state (mask, box, fraction)
/// lives in handler locals, so concurrent requests are fully independent.
pub struct AppState<S: VolumeSource, E: MeshEngine> {
    pub pipeline: Arc<MeshPipeline<S, E>>,
}

impl<S: VolumeSource, E: MeshEngine> AppState<S, E> {
    pub fn new(pipeline: MeshPipeline<S, E>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

impl<S: VolumeSource, E: MeshEngine> Clone for AppState<S, E> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for mesh requests.
///
/// Everything arrives as optional strings; [`build_mesh_request`] validates
/// presence of the mandatory ones and parses the rest, so a missing or
/// malformed parameter yields a 400 naming that parameter instead of a
/// generic extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct MeshQueryParams {
    /// Data source server (required).
    pub dvid: Option<String>,

    /// Object identifier (required, u64).
    pub body: Option<String>,

    /// Segmentation instance name (default: "segmentation").
    pub segmentation: Option<String>,

    /// Destination key-value instance (default: "<segmentation>_meshes").
    pub mesh_kv: Option<String>,

    /// Explicit data version; defaults to the latest master version.
    pub uuid: Option<String>,

    /// Explicit resolution level override.
    pub scale: Option<String>,

    /// Smoothing rounds (default: 2).
    pub smoothing: Option<String>,

    /// Base decimation fraction in (0, 1] (default: 0.1).
    pub decimation: Option<String>,

    /// Requesting principal, short form.
    pub u: Option<String>,

    /// Requesting principal, long form.
    pub user: Option<String>,
}

/// Validate and resolve query parameters into an immutable [`MeshRequest`].
pub fn build_mesh_request(
    params: MeshQueryParams,
    authorization: Option<String>,
) -> Result<MeshRequest, PipelineError> {
    let server = non_empty(params.dvid).ok_or(PipelineError::MissingParameter { name: "dvid" })?;
    let body_str = non_empty(params.body).ok_or(PipelineError::MissingParameter { name: "body" })?;
    let body: u64 = body_str
        .parse()
        .map_err(|_| PipelineError::InvalidParameter {
            name: "body",
            message: format!("expected an unsigned integer, got {body_str:?}"),
        })?;

    let segmentation = non_empty(params.segmentation)
        .unwrap_or_else(|| DEFAULT_SEGMENTATION.to_string());
    let mesh_store =
        non_empty(params.mesh_kv).unwrap_or_else(|| format!("{segmentation}_meshes"));

    let level = match non_empty(params.scale) {
        None => None,
        Some(s) => Some(s.parse::<u8>().map_err(|_| PipelineError::InvalidParameter {
            name: "scale",
            message: format!("expected a small unsigned integer, got {s:?}"),
        })?),
    };

    let smoothing = match non_empty(params.smoothing) {
        None => DEFAULT_SMOOTHING,
        Some(s) => s.parse().map_err(|_| PipelineError::InvalidParameter {
            name: "smoothing",
            message: format!("expected an unsigned integer, got {s:?}"),
        })?,
    };

    let decimation = match non_empty(params.decimation) {
        None => DEFAULT_DECIMATION,
        Some(s) => {
            let value: f64 = s.parse().map_err(|_| PipelineError::InvalidParameter {
                name: "decimation",
                message: format!("expected a number, got {s:?}"),
            })?;
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(PipelineError::InvalidParameter {
                    name: "decimation",
                    message: format!("{value} is outside (0, 1]"),
                });
            }
            value
        }
    };

    let user = non_empty(params.u)
        .or_else(|| non_empty(params.user))
        .unwrap_or_else(|| UNKNOWN_USER.to_string());

    Ok(MeshRequest {
        server,
        body,
        segmentation,
        mesh_store,
        version: non_empty(params.uuid),
        level,
        smoothing,
        decimation,
        user,
        authorization,
    })
}

/// Treat absent and empty-string parameters alike.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response for non-parameter failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "empty_object", "source_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    pub status: u16,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert PipelineError to HTTP response.
///
/// Parameter errors and the box-size limit answer with plain-text bodies
/// that name the offending parameter or level; callers and scripts grep
/// those. Everything else answers with a JSON error body.
///
/// - 4xx errors are logged at WARN level (404 at DEBUG)
/// - 5xx errors are logged at ERROR level
impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            PipelineError::MissingParameter { .. } => (StatusCode::BAD_REQUEST, "missing_parameter"),
            PipelineError::InvalidParameter { .. } => (StatusCode::BAD_REQUEST, "invalid_parameter"),
            PipelineError::BoundingBoxTooLarge { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "bounding_box_too_large")
            }
            PipelineError::EmptyObject { .. } => (StatusCode::NOT_FOUND, "empty_object"),
            PipelineError::Source(_) => (StatusCode::BAD_GATEWAY, "source_error"),
            PipelineError::Engine(_) => (StatusCode::INTERNAL_SERVER_ERROR, "engine_error"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        match self {
            PipelineError::MissingParameter { .. }
            | PipelineError::InvalidParameter { .. }
            | PipelineError::BoundingBoxTooLarge { .. } => (status, message).into_response(),
            _ => {
                let body = ErrorResponse {
                    error: error_type.to_string(),
                    message,
                    status: status.as_u16(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle mesh generation requests.
///
/// # Endpoint
///
/// `GET /`
///
/// # Query Parameters
///
/// - `dvid`: Data source server, base URL or host:port (required)
/// - `body`: Object identifier, u64 (required)
/// - `segmentation`: Segmentation instance (default: "segmentation")
/// - `mesh_kv`: Destination key-value instance (default: "<segmentation>_meshes")
/// - `uuid`: Data version (default: latest master version)
/// - `scale`: Resolution level override (default: adaptive, floored at 1)
/// - `smoothing`: Smoothing rounds (default: 2)
/// - `decimation`: Base decimation fraction in (0, 1] (default: 0.1)
/// - `u` / `user`: Requesting principal (default: "UNKNOWN")
///
/// An inbound `Authorization` header is forwarded on every outbound call
/// made for this request.
///
/// # Response
///
/// - `200 OK`: Raw ngmesh bytes with `Content-Type: application/octet-stream`
/// - `400 Bad Request`: Missing or invalid parameter, plain text naming it
/// - `404 Not Found`: Object has no occupied voxels
/// - `500 Internal Server Error`: Bounding box too large, or engine failure
/// - `502 Bad Gateway`: Data source failure
///
/// # Headers
///
/// - `X-Mesh-Level`: the working resolution level
/// - `X-Mesh-Decimation`: the effective decimation fraction
/// - `X-Mesh-Triangles`: final triangle count
pub async fn mesh_handler<S: VolumeSource, E: MeshEngine>(
    State(state): State<AppState<S, E>>,
    Query(params): Query<MeshQueryParams>,
    headers: HeaderMap,
) -> Result<Response, PipelineError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let request = build_mesh_request(params, authorization)?;
    let outcome = state.pipeline.run(&request).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header("X-Mesh-Level", outcome.level.to_string())
        .header("X-Mesh-Decimation", outcome.decimation.to_string())
        .header("X-Mesh-Triangles", outcome.triangles.to_string())
        .body(axum::body::Body::from(outcome.bytes))
        .unwrap();

    Ok(response)
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
