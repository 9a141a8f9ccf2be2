//! Native mesh engine: surface nets extraction, Laplacian smoothing,
//! vertex-clustering decimation, and ngmesh serialization.
//!
//! # Surface nets
//!
//! The mask's voxels are treated as samples on a lattice. Every 2x2x2 cell
//! of samples with mixed occupancy gets one vertex, placed at the centroid
//! of its crossing-edge midpoints. For every lattice edge whose endpoints
//! differ in occupancy, the four cells sharing that edge are stitched into a
//! quad (two triangles), wound by which endpoint is solid. On a halo-padded
//! mask this yields a closed surface.

use std::collections::HashSet;

use bytes::{BufMut, Bytes, BytesMut};
use nalgebra::{Point3, Vector3};

use crate::error::EngineError;
use crate::voxel::{PhysicalBox, VolumeMask};

use super::{MeshArtifact, MeshEngine};

/// Sentinel for cells without a surface vertex.
const NO_VERTEX: u32 = u32::MAX;

/// Upper bound for the clustering grid resolution search.
const MAX_CLUSTER_GRID: u32 = 1024;

/// The built-in mesh engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeMesher;

impl NativeMesher {
    pub fn new() -> Self {
        Self
    }
}

impl MeshEngine for NativeMesher {
    fn build(
        &self,
        mask: &VolumeMask,
        physical: &PhysicalBox,
        smoothing_rounds: u32,
    ) -> Result<MeshArtifact, EngineError> {
        let mut mesh = extract_surface(mask, physical);
        smooth(&mut mesh, smoothing_rounds);
        Ok(mesh)
    }

    fn simplify(&self, mesh: &mut MeshArtifact, fraction: f64) -> Result<(), EngineError> {
        if !fraction.is_finite() || fraction <= 0.0 {
            return Err(EngineError::InvalidFraction(fraction));
        }
        if fraction >= 1.0 || mesh.is_empty() {
            return Ok(());
        }

        let target = ((mesh.triangle_count() as f64 * fraction).round() as usize).max(1);

        // The clustered triangle count grows with grid resolution; binary
        // search for the finest grid that stays within the target.
        let mut lo = 1u32;
        let mut hi = MAX_CLUSTER_GRID;
        while lo < hi {
            let mid = lo + (hi - lo).div_ceil(2);
            if cluster(mesh, mid).triangle_count() <= target {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }

        // Never decimate a non-empty mesh to nothing: if the chosen grid
        // collapses every triangle, step up to the coarsest grid that keeps
        // a surface, even if it overshoots the target.
        let mut result = cluster(mesh, lo);
        while result.is_empty() && lo < MAX_CLUSTER_GRID {
            lo += 1;
            result = cluster(mesh, lo);
        }
        if !result.is_empty() {
            *mesh = result;
        }
        Ok(())
    }

    fn serialize(&self, mesh: &MeshArtifact) -> Result<Bytes, EngineError> {
        let vertex_count = u32::try_from(mesh.vertex_count()).map_err(|_| {
            EngineError::Serialize(format!(
                "vertex count {} exceeds the ngmesh u32 limit",
                mesh.vertex_count()
            ))
        })?;

        let mut buf = BytesMut::with_capacity(4 + 12 * mesh.vertex_count() + 12 * mesh.triangle_count());
        buf.put_u32_le(vertex_count);
        for v in &mesh.vertices {
            buf.put_f32_le(v.x);
            buf.put_f32_le(v.y);
            buf.put_f32_le(v.z);
        }
        for t in &mesh.triangles {
            buf.put_u32_le(t[0]);
            buf.put_u32_le(t[1]);
            buf.put_u32_le(t[2]);
        }
        Ok(buf.freeze())
    }
}

// =============================================================================
// Surface extraction
// =============================================================================

fn extract_surface(mask: &VolumeMask, physical: &PhysicalBox) -> MeshArtifact {
    let [dx, dy, dz] = mask.dims();
    if dx < 2 || dy < 2 || dz < 2 {
        return MeshArtifact {
            vertices: Vec::new(),
            triangles: Vec::new(),
        };
    }

    // Physical size of one voxel step, per axis.
    let pdims = physical.dims();
    let step = [
        (pdims[0] / dx as f64) as f32,
        (pdims[1] / dy as f64) as f32,
        (pdims[2] / dz as f64) as f32,
    ];
    let origin = [
        physical.min[0] as f32,
        physical.min[1] as f32,
        physical.min[2] as f32,
    ];

    let (cx, cy, cz) = (dx - 1, dy - 1, dz - 1);
    let cell_id = |x: usize, y: usize, z: usize| x + cx * (y + cy * z);

    let mut cell_vertex = vec![NO_VERTEX; cx * cy * cz];
    let mut vertices: Vec<Point3<f32>> = Vec::new();

    // Pass 1: one vertex per mixed-occupancy cell, at the centroid of its
    // crossing-edge midpoints.
    for z in 0..cz {
        for y in 0..cy {
            for x in 0..cx {
                let mut corners = [false; 8];
                for (i, corner) in corners.iter_mut().enumerate() {
                    *corner = mask.get(x + (i & 1), y + ((i >> 1) & 1), z + ((i >> 2) & 1));
                }
                if corners.iter().all(|&c| c) || corners.iter().all(|&c| !c) {
                    continue;
                }

                let mut sum = Vector3::zeros();
                let mut crossings = 0u32;
                for a in &CELL_EDGES {
                    let (i, j) = (a.0, a.1);
                    if corners[i] != corners[j] {
                        sum += (corner_offset(i) + corner_offset(j)) * 0.5;
                        crossings += 1;
                    }
                }
                let local = sum / crossings as f32;

                // Sample i sits at the center of voxel i, hence the +0.5.
                let position = Point3::new(
                    origin[0] + (x as f32 + local.x + 0.5) * step[0],
                    origin[1] + (y as f32 + local.y + 0.5) * step[1],
                    origin[2] + (z as f32 + local.z + 0.5) * step[2],
                );
                cell_vertex[cell_id(x, y, z)] = vertices.len() as u32;
                vertices.push(position);
            }
        }
    }

    // Pass 2: stitch a quad across every crossing lattice edge. Interior
    // iteration bounds keep all four adjacent cells in range; a halo-padded
    // mask has no crossings outside them.
    let mut triangles: Vec<[u32; 3]> = Vec::new();
    let dims = [dx, dy, dz];
    for axis in 0..3 {
        let (b, c) = ((axis + 1) % 3, (axis + 2) % 3);
        let mut p = [0usize; 3];
        for pc in 1..dims[c] - 1 {
            for pb in 1..dims[b] - 1 {
                for pa in 0..dims[axis] - 1 {
                    p[axis] = pa;
                    p[b] = pb;
                    p[c] = pc;

                    let solid0 = mask.get(p[0], p[1], p[2]);
                    let mut q = p;
                    q[axis] += 1;
                    let solid1 = mask.get(q[0], q[1], q[2]);
                    if solid0 == solid1 {
                        continue;
                    }

                    let vert = |ub: usize, uc: usize| {
                        let mut cell = p;
                        cell[b] = p[b] - 1 + ub;
                        cell[c] = p[c] - 1 + uc;
                        cell_vertex[cell_id(cell[0], cell[1], cell[2])]
                    };
                    let (i00, i10, i11, i01) = (vert(0, 0), vert(1, 0), vert(1, 1), vert(0, 1));
                    debug_assert!(
                        i00 != NO_VERTEX && i10 != NO_VERTEX && i11 != NO_VERTEX && i01 != NO_VERTEX
                    );

                    if solid0 {
                        triangles.push([i00, i10, i11]);
                        triangles.push([i00, i11, i01]);
                    } else {
                        triangles.push([i00, i11, i10]);
                        triangles.push([i00, i01, i11]);
                    }
                }
            }
        }
    }

    MeshArtifact {
        vertices,
        triangles,
    }
}

/// The 12 edges of a cell, as corner-index pairs (bit 0 = x, 1 = y, 2 = z).
const CELL_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (2, 3),
    (4, 5),
    (6, 7),
    (0, 2),
    (1, 3),
    (4, 6),
    (5, 7),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

fn corner_offset(i: usize) -> Vector3<f32> {
    Vector3::new((i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32)
}

// =============================================================================
// Smoothing
// =============================================================================

/// Uniform Laplacian smoothing: each round replaces every vertex with the
/// mean of its edge neighbors. Vertices with no neighbors are left alone.
fn smooth(mesh: &mut MeshArtifact, rounds: u32) {
    if rounds == 0 || mesh.is_empty() {
        return;
    }

    let mut neighbors: Vec<Vec<u32>> = vec![Vec::new(); mesh.vertex_count()];
    for t in &mesh.triangles {
        for (i, j) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
            neighbors[i as usize].push(j);
            neighbors[j as usize].push(i);
        }
    }
    for list in &mut neighbors {
        list.sort_unstable();
        list.dedup();
    }

    for _ in 0..rounds {
        let mut next = mesh.vertices.clone();
        for (i, list) in neighbors.iter().enumerate() {
            if list.is_empty() {
                continue;
            }
            let mut sum = Vector3::zeros();
            for &n in list {
                sum += mesh.vertices[n as usize].coords;
            }
            next[i] = Point3::from(sum / list.len() as f32);
        }
        mesh.vertices = next;
    }
}

// =============================================================================
// Decimation
// =============================================================================

/// Cluster vertices on a uniform `resolution`^3 grid over the mesh bounds.
///
/// Each occupied cell is replaced by the mean of its vertices; triangles are
/// remapped, and degenerate or duplicate triangles dropped.
fn cluster(mesh: &MeshArtifact, resolution: u32) -> MeshArtifact {
    let Some((lo, hi)) = vertex_bounds(mesh) else {
        return mesh.clone();
    };

    let res = resolution as f32;
    let extent = [
        (hi[0] - lo[0]).max(f32::EPSILON),
        (hi[1] - lo[1]).max(f32::EPSILON),
        (hi[2] - lo[2]).max(f32::EPSILON),
    ];
    let cell_of = |v: &Point3<f32>| -> (u32, u32, u32) {
        let bin = |coord: f32, lo: f32, ext: f32| {
            (((coord - lo) / ext * res) as u32).min(resolution - 1)
        };
        (
            bin(v.x, lo[0], extent[0]),
            bin(v.y, lo[1], extent[1]),
            bin(v.z, lo[2], extent[2]),
        )
    };

    let mut cell_to_cluster: std::collections::HashMap<(u32, u32, u32), u32> =
        std::collections::HashMap::new();
    let mut remap = vec![0u32; mesh.vertex_count()];
    let mut sums: Vec<(Vector3<f32>, u32)> = Vec::new();

    for (i, v) in mesh.vertices.iter().enumerate() {
        let cluster_id = *cell_to_cluster.entry(cell_of(v)).or_insert_with(|| {
            sums.push((Vector3::zeros(), 0));
            (sums.len() - 1) as u32
        });
        let slot = &mut sums[cluster_id as usize];
        slot.0 += v.coords;
        slot.1 += 1;
        remap[i] = cluster_id;
    }

    let vertices: Vec<Point3<f32>> = sums
        .iter()
        .map(|(sum, n)| Point3::from(sum / *n as f32))
        .collect();

    let mut seen: HashSet<[u32; 3]> = HashSet::new();
    let mut triangles = Vec::new();
    for t in &mesh.triangles {
        let mapped = [
            remap[t[0] as usize],
            remap[t[1] as usize],
            remap[t[2] as usize],
        ];
        if mapped[0] == mapped[1] || mapped[1] == mapped[2] || mapped[0] == mapped[2] {
            continue;
        }
        let mut key = mapped;
        key.sort_unstable();
        if seen.insert(key) {
            triangles.push(mapped);
        }
    }

    MeshArtifact {
        vertices,
        triangles,
    }
}

fn vertex_bounds(mesh: &MeshArtifact) -> Option<([f32; 3], [f32; 3])> {
    let first = mesh.vertices.first()?;
    let mut lo = [first.x, first.y, first.z];
    let mut hi = lo;
    for v in &mesh.vertices {
        lo[0] = lo[0].min(v.x);
        lo[1] = lo[1].min(v.y);
        lo[2] = lo[2].min(v.z);
        hi[0] = hi[0].max(v.x);
        hi[1] = hi[1].max(v.y);
        hi[2] = hi[2].max(v.z);
    }
    Some((lo, hi))
}

// =============================================================================
// Tests
// =============================================================================
