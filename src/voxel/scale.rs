//! Resolution-level selection and decimation compensation.
//!
//! Level `n` voxels have linear size `base_voxel_size * 2^n` per axis, so
//! each level increment shrinks the voxel count of a box by roughly 8x
//! (modulo floor rounding at small extents). These two functions encode the
//! service's sizing policy: pick the coarsest level that fits the memory
//! budget, then relax the decimation target so visual detail stays roughly
//! constant no matter which level was chosen.

use crate::error::PipelineError;
use crate::voxel::Box3;

/// Choose the smallest resolution level at which `full_res_box` fits the
/// voxel budget.
///
/// Starts at level 0 and halves every box dimension (floor division) until
/// the voxel count is within `max_voxels`. Fails with
/// [`PipelineError::BoundingBoxTooLarge`] if even `max_level` is not coarse
/// enough.
///
/// Note: this is the raw search. The default-path floor of "never coarser
/// than level 1 unless the caller asks" is applied by the pipeline, not
/// here, so an explicit caller override can still reach level 0.
pub fn select_level(
    full_res_box: Box3,
    max_voxels: u64,
    max_level: u8,
) -> Result<u8, PipelineError> {
    let mut level: u8 = 0;
    let mut bounds = full_res_box;

    while bounds.voxel_count() > max_voxels as u128 {
        level = level.saturating_add(1);
        bounds = bounds.halved();

        if level > max_level {
            return Err(PipelineError::BoundingBoxTooLarge { level, max_level });
        }
    }

    Ok(level)
}

/// Compute the effective decimation fraction for a working level.
///
/// Triangle counts at level `n` are already ~4x sparser per level increment
/// relative to level 1 (linear dimension halved, surface area quartered), so
/// the target fraction is relaxed by `4^(level - 1)` and clamped at 1.0 (no
/// simplification). Levels 0 and 1 use the base fraction unchanged.
pub fn effective_decimation(base: f64, level: u8) -> f64 {
    if level > 1 {
        (base * 4f64.powi(level as i32 - 1)).min(1.0)
    } else {
        base
    }
}

// =============================================================================
// Tests
// =============================================================================
