//! Mesh engine layer.
//!
//! The pipeline synthesizes geometry through the [`MeshEngine`] port:
//! surface extraction from a binary mask, in-place simplification, and
//! serialization to the ngmesh byte layout. [`NativeMesher`] is the concrete
//! implementation; tests substitute deterministic stubs.

pub mod native;

use bytes::Bytes;
use nalgebra::Point3;

use crate::error::EngineError;
use crate::voxel::{PhysicalBox, VolumeMask};

pub use native::NativeMesher;

/// A triangle surface mesh with vertex positions in physical units.
///
/// Owned exclusively by one pipeline invocation: built, decimated in place,
/// serialized, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshArtifact {
    /// Vertex positions in physical units (nanometers).
    pub vertices: Vec<Point3<f32>>,

    /// Triangles as vertex-index triples.
    pub triangles: Vec<[u32; 3]>,
}

impl MeshArtifact {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Port to the mesh construction, simplification, and serialization engine.
///
/// All operations are synchronous CPU work; the pipeline calls them on the
/// request task with no timeout, matching the service's single-attempt,
/// no-cancellation model.
pub trait MeshEngine: Send + Sync {
    /// Extract a surface mesh from a binary mask.
    ///
    /// The mask is expected to be halo-padded so no occupied voxel touches
    /// the grid boundary. Vertices are mapped into `physical` and smoothed
    /// for `smoothing_rounds` rounds.
    fn build(
        &self,
        mask: &VolumeMask,
        physical: &PhysicalBox,
        smoothing_rounds: u32,
    ) -> Result<MeshArtifact, EngineError>;

    /// Simplify the mesh in place toward `fraction` of its current triangle
    /// count. A fraction >= 1.0 is a no-op.
    fn simplify(&self, mesh: &mut MeshArtifact, fraction: f64) -> Result<(), EngineError>;

    /// Serialize to the ngmesh binary layout: u32 LE vertex count, 3 x f32
    /// LE per vertex, then 3 x u32 LE vertex indices per triangle.
    fn serialize(&self, mesh: &MeshArtifact) -> Result<Bytes, EngineError>;
}
