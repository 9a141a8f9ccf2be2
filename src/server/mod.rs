//! HTTP server layer for the mesh generation service.
//!
//! One endpoint does the work: `GET /` with query parameters identifying
//! the data source, the object, and the meshing knobs. The handler layer
//! validates parameters and maps pipeline errors to HTTP statuses; the
//! router layer wires CORS and request tracing around it.

pub mod handlers;
pub mod routes;

pub use handlers::{
    build_mesh_request, health_handler, mesh_handler, AppState, ErrorResponse, HealthResponse,
    MeshQueryParams, DEFAULT_DECIMATION, DEFAULT_SEGMENTATION, DEFAULT_SMOOTHING,
};
pub use routes::{create_router, RouterConfig};
