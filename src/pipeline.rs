//! The adaptive-resolution mesh generation pipeline.
//!
//! One request runs the whole sequence start to finish on one logical task:
//!
//! 1. Resolve the effective data version (caller's, or the master tip)
//! 2. Query the coarse extent and reduce it to a full-resolution box
//! 3. Pick the working resolution level and the effective decimation
//! 4. Fetch the binary mask at that level (the expensive step)
//! 5. Halo-pad the mask
//! 6. Map the padded box into physical units
//! 7. Build the surface mesh with smoothing
//! 8. Decimate in place
//! 9. Serialize to ngmesh bytes
//! 10. Store the bytes under `{body}.ngmesh` and return them
//!
//! Every step is synchronous with respect to the request and strictly
//! ordered; nothing is retried, and any failure aborts the run with no
//! partial output. Concurrent requests are fully independent; two requests
//! for the same body will both compute and both write, racing benignly at
//! the storage key.

use std::time::Instant;

use tracing::{debug, info};

use crate::config::PipelineLimits;
use crate::error::PipelineError;
use crate::mesh::MeshEngine;
use crate::source::{SourceContext, VolumeSource};
use crate::voxel::{effective_decimation, select_level};

use bytes::Bytes;

/// Principal recorded when the caller did not identify themselves.
pub const UNKNOWN_USER: &str = "UNKNOWN";

/// Everything needed to generate and store one mesh. Immutable once built.
#[derive(Debug, Clone)]
pub struct MeshRequest {
    /// Data source server (base URL or host:port).
    pub server: String,

    /// Object (body) identifier.
    pub body: u64,

    /// Segmentation instance name.
    pub segmentation: String,

    /// Destination key-value instance for the mesh bytes.
    pub mesh_store: String,

    /// Explicit data version; resolved to the master tip when absent.
    pub version: Option<String>,

    /// Explicit resolution level override; selected adaptively when absent.
    pub level: Option<u8>,

    /// Laplacian smoothing rounds for mesh construction.
    pub smoothing: u32,

    /// Base decimation fraction, before level compensation.
    pub decimation: f64,

    /// Requesting principal, for auditing.
    pub user: String,

    /// Inbound authorization credential, forwarded outbound.
    pub authorization: Option<String>,
}

/// Result of one pipeline run: the serialized bytes plus the choices the
/// pipeline made, for response headers and logging.
#[derive(Debug, Clone)]
pub struct MeshOutcome {
    pub bytes: Bytes,
    pub level: u8,
    pub decimation: f64,
    pub triangles: usize,
    pub key: String,
}

/// Orchestrates the mesh generation sequence over injected ports.
pub struct MeshPipeline<S, E> {
    source: S,
    engine: E,
    limits: PipelineLimits,
}

impl<S: VolumeSource, E: MeshEngine> MeshPipeline<S, E> {
    pub fn new(source: S, engine: E, limits: PipelineLimits) -> Self {
        Self {
            source,
            engine,
            limits,
        }
    }

    pub fn limits(&self) -> &PipelineLimits {
        &self.limits
    }

    /// Run the full sequence for one request.
    pub async fn run(&self, request: &MeshRequest) -> Result<MeshOutcome, PipelineError> {
        let started = Instant::now();
        let body = request.body;
        let ctx = SourceContext {
            server: request.server.clone(),
            user: request.user.clone(),
            authorization: request.authorization.clone(),
        };

        // 1. Effective data version.
        let version = match &request.version {
            Some(v) => v.clone(),
            None => self.source.latest_version(&ctx).await?,
        };

        // 2. Coarse extent, reduced to a full-resolution bounding box.
        let step = Instant::now();
        let extent = self
            .source
            .coarse_extent(&ctx, &version, &request.segmentation, body)
            .await?;
        debug!(body, elapsed = ?step.elapsed(), "Fetched coarse sparsevol");

        let coarse_box = extent
            .bounding_box()
            .ok_or(PipelineError::EmptyObject { body })?;
        let full_res_box = coarse_box.upscaled(self.limits.coarse_level);
        info!(
            body,
            min = ?full_res_box.min,
            max = ?full_res_box.max,
            "Full-resolution bounding box"
        );

        // 3. Working level and effective decimation. The default path never
        // goes finer than level 1; an explicit override may.
        let level = match request.level {
            Some(level) => {
                if level > self.limits.max_level {
                    return Err(PipelineError::InvalidParameter {
                        name: "scale",
                        message: format!(
                            "level {level} exceeds the maximum level {}",
                            self.limits.max_level
                        ),
                    });
                }
                level
            }
            None => select_level(full_res_box, self.limits.max_box_voxels, self.limits.max_level)?
                .max(1),
        };
        let decimation = effective_decimation(request.decimation, level);

        // 4. The fine mask fetch, single-attempt.
        let step = Instant::now();
        let mask = self
            .source
            .fetch_mask(&ctx, &version, &request.segmentation, body, level)
            .await?;
        debug!(body, level, elapsed = ?step.elapsed(), "Fetched sparsevol mask");

        // 5-6. Halo pad, then map into physical units.
        let padded = mask.pad_halo();
        let physical = padded
            .bounds()
            .to_physical(level, self.limits.base_voxel_size);

        // 7-9. Build, decimate in place, serialize.
        let step = Instant::now();
        let mut mesh = self.engine.build(&padded, &physical, request.smoothing)?;
        debug!(
            body,
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            elapsed = ?step.elapsed(),
            "Computed mesh"
        );

        info!(body, fraction = decimation, "Decimating mesh");
        self.engine.simplify(&mut mesh, decimation)?;
        let triangles = mesh.triangle_count();

        let bytes = self.engine.serialize(&mesh)?;

        // 10. Store, then hand the bytes back.
        let key = format!("{body}.ngmesh");
        let step = Instant::now();
        self.source
            .store_mesh(&ctx, &version, &request.mesh_store, &key, bytes.clone())
            .await?;
        info!(
            body,
            key = %key,
            size_mb = bytes.len() as f64 / (1 << 20) as f64,
            elapsed = ?step.elapsed(),
            "Stored mesh"
        );

        info!(body, level, triangles, total = ?started.elapsed(), "Request complete");
        Ok(MeshOutcome {
            bytes,
            level,
            decimation,
            triangles,
            key,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
