//! Dense binary occupancy masks.

use super::box3::Box3;

/// A 3-D binary occupancy mask plus its bounding box.
///
/// The box is expressed in the voxel coordinates of a specific resolution
/// level; the mask stores one bool per voxel of the box, x-fastest.
///
/// Invariant: the box dimensions equal the mask dimensions exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeMask {
    voxels: Vec<bool>,
    bounds: Box3,
}

impl VolumeMask {
    /// Create a mask from raw voxels and their bounding box.
    ///
    /// Panics if the voxel count does not match the box volume; callers
    /// construct masks from boxes they derived themselves, so a mismatch is
    /// a programming error, not an input error.
    pub fn new(voxels: Vec<bool>, bounds: Box3) -> Self {
        assert_eq!(
            voxels.len() as u128,
            bounds.voxel_count(),
            "mask size must match box volume"
        );
        Self { voxels, bounds }
    }

    /// Create an all-empty mask covering the given box.
    pub fn empty(bounds: Box3) -> Self {
        Self {
            voxels: vec![false; bounds.voxel_count() as usize],
            bounds,
        }
    }

    /// The mask's bounding box.
    pub fn bounds(&self) -> Box3 {
        self.bounds
    }

    /// Per-axis dimensions of the mask grid.
    pub fn dims(&self) -> [usize; 3] {
        self.bounds.dims().map(|d| d as usize)
    }

    /// Occupancy at local grid coordinates (relative to the box minimum).
    pub fn get(&self, x: usize, y: usize, z: usize) -> bool {
        let [dx, dy, _] = self.dims();
        self.voxels[x + dx * (y + dy * z)]
    }

    /// Set occupancy at local grid coordinates.
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: bool) {
        let [dx, dy, _] = self.dims();
        self.voxels[x + dx * (y + dy * z)] = value;
    }

    /// Number of occupied voxels.
    pub fn occupied_count(&self) -> usize {
        self.voxels.iter().filter(|v| **v).count()
    }

    /// Pad the mask with exactly one layer of unoccupied voxels on every
    /// face, shifting the box minimum by -1 and maximum by +1 per axis.
    ///
    /// Surface extraction on a box whose boundary coincides with occupied
    /// voxels produces false open boundaries where the object is clipped by
    /// the query box; the halo guarantees every occupied region is fully
    /// enclosed by empty space.
    pub fn pad_halo(&self) -> VolumeMask {
        let [dx, dy, dz] = self.dims();
        let mut padded = VolumeMask::empty(self.bounds.grown(1));
        for z in 0..dz {
            for y in 0..dy {
                for x in 0..dx {
                    if self.get(x, y, z) {
                        padded.set(x + 1, y + 1, z + 1, true);
                    }
                }
            }
        }
        padded
    }
}

// =============================================================================
// Tests
// =============================================================================
