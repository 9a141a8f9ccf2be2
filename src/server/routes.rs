//! Router configuration for the mesh generation service.
//!
//! # Route Structure
//!
//! ```text
//! /          - Generate, store, and return a mesh (query-parameter driven)
//! /health    - Health check
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, mesh_handler, AppState};
use crate::mesh::MeshEngine;
use crate::pipeline::MeshPipeline;
use crate::source::VolumeSource;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a configuration with tracing enabled and any-origin CORS.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router over a constructed pipeline.
pub fn create_router<S, E>(pipeline: MeshPipeline<S, E>, config: RouterConfig) -> Router
where
    S: VolumeSource + 'static,
    E: MeshEngine + 'static,
{
    let state = AppState::new(pipeline);
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/", get(mesh_handler::<S, E>))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) => {
            let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
