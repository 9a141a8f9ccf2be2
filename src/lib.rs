//! # DVID Meshgen
//!
//! A mesh generation service for DVID segmentations.
//!
//! One request type: "generate a surface mesh for labeled object X and
//! store it." The core is an adaptive-resolution pipeline that sizes the
//! problem before paying for it: a cheap coarse sparse-volume query bounds
//! the object, a scale selector picks the coarsest resolution level that
//! fits a hard voxel budget, and only then is the dense mask fetched,
//! halo-padded, meshed, decimated, and stored.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`voxel`] - Boxes, masks, scale selection, decimation compensation
//! - [`source`] - The `VolumeSource` port and its DVID HTTP adapter
//! - [`mesh`] - The `MeshEngine` port and the native surface-nets mesher
//! - [`pipeline`] - The orchestrated ten-step generation sequence
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use dvid_meshgen::{
//!     config::PipelineLimits,
//!     mesh::NativeMesher,
//!     pipeline::MeshPipeline,
//!     server::{create_router, RouterConfig},
//!     source::DvidClient,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = DvidClient::new(reqwest::Client::new());
//!     let pipeline = MeshPipeline::new(client, NativeMesher::new(), PipelineLimits::default());
//!     let router = create_router(pipeline, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod mesh;
pub mod pipeline;
pub mod server;
pub mod source;
pub mod voxel;

// Re-export commonly used types
pub use config::{Config, PipelineLimits};
pub use error::{EngineError, PipelineError, SourceError};
pub use mesh::{MeshArtifact, MeshEngine, NativeMesher};
pub use pipeline::{MeshOutcome, MeshPipeline, MeshRequest, UNKNOWN_USER};
pub use server::{create_router, AppState, MeshQueryParams, RouterConfig};
pub use source::{CoarseExtent, DvidClient, RleSpan, SourceContext, VolumeSource};
pub use voxel::{effective_decimation, select_level, Box3, PhysicalBox, VolumeMask};
