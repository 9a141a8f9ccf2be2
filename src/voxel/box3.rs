//! Axis-aligned bounding boxes in voxel and physical space.
//!
//! Voxel boxes use the half-open convention `[min, max)`: a box with
//! `min = [0, 0, 0]` and `max = [2, 2, 2]` covers exactly 8 voxels. Axis
//! order is `[x, y, z]` throughout.

/// An integer axis-aligned bounding box, half-open per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Box3 {
    /// Inclusive minimum corner.
    pub min: [i64; 3],

    /// Exclusive maximum corner.
    pub max: [i64; 3],
}

impl Box3 {
    /// Create a box from its corners.
    pub fn new(min: [i64; 3], max: [i64; 3]) -> Self {
        Self { min, max }
    }

    /// Per-axis extents. Degenerate axes (max <= min) report 0.
    pub fn dims(&self) -> [u64; 3] {
        let d = |a: usize| (self.max[a] - self.min[a]).max(0) as u64;
        [d(0), d(1), d(2)]
    }

    /// Total voxel count, computed in u128 so enormous full-resolution
    /// boxes cannot overflow.
    pub fn voxel_count(&self) -> u128 {
        let [dx, dy, dz] = self.dims();
        dx as u128 * dy as u128 * dz as u128
    }

    /// Scale both corners up by `2^level` (voxel coordinates at a coarser
    /// level mapped down to level 0).
    pub fn upscaled(&self, level: u8) -> Box3 {
        let f = 1i64 << level;
        Box3 {
            min: self.min.map(|c| c * f),
            max: self.max.map(|c| c * f),
        }
    }

    /// Halve both corners with floor division, rounding toward negative
    /// infinity so boxes with negative coordinates shrink consistently.
    pub fn halved(&self) -> Box3 {
        Box3 {
            min: self.min.map(|c| c.div_euclid(2)),
            max: self.max.map(|c| c.div_euclid(2)),
        }
    }

    /// Grow the box by one voxel on every face (halo padding).
    pub fn grown(&self, amount: i64) -> Box3 {
        Box3 {
            min: self.min.map(|c| c - amount),
            max: self.max.map(|c| c + amount),
        }
    }

    /// Map this voxel-space box at `level` into physical units.
    ///
    /// Purely a scale transform: `coord * base_voxel_size * 2^level` per
    /// element. Never fails for finite inputs.
    pub fn to_physical(&self, level: u8, base_voxel_size: f64) -> PhysicalBox {
        let scale = base_voxel_size * (1u64 << level) as f64;
        PhysicalBox {
            min: self.min.map(|c| c as f64 * scale),
            max: self.max.map(|c| c as f64 * scale),
        }
    }
}

/// An axis-aligned bounding box in physical units (nanometers).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl PhysicalBox {
    /// Per-axis extents in physical units.
    pub fn dims(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

// =============================================================================
// Tests
// =============================================================================
