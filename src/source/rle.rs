//! DVID sparse-volume RLE wire codec.
//!
//! Both the coarse and the fine sparse-volume endpoints answer with the same
//! binary run-length encoding:
//!
//! ```text
//! Offset  Size  Field
//! 0       1     payload descriptor (0 = binary sparse volume)
//! 1       1     number of dimensions (3)
//! 2       1     run dimension (0 = runs along X)
//! 3       1     reserved
//! 4       4     u32 LE total voxel count (0 = unset)
//! 8       4     u32 LE span count
//! 12      16*N  per span: i32 LE x, y, z, run length
//! ```
//!
//! Spans are expressed in the queried level's voxel coordinates.

use crate::error::SourceError;
use crate::voxel::{Box3, VolumeMask};

/// Size of the fixed RLE header in bytes.
pub const RLE_HEADER_SIZE: usize = 12;

/// Size of one encoded span in bytes.
pub const RLE_SPAN_SIZE: usize = 16;

/// Upper bound on the voxel volume `inflate` will materialize.
///
/// Working-level masks are budget-limited upstream; a well-formed payload
/// whose spans cover anything near this volume is corrupt, and inflating it
/// would allocate unboundedly before any indexing went wrong.
pub const MAX_INFLATED_VOXELS: u128 = 1 << 31;

/// One run of occupied voxels along the X axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RleSpan {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub run: i32,
}

/// Decode a sparse-volume payload into its spans.
pub fn decode_spans(payload: &[u8]) -> Result<Vec<RleSpan>, SourceError> {
    if payload.len() < RLE_HEADER_SIZE {
        return Err(SourceError::Decode(format!(
            "RLE payload too short: {} bytes, need at least {}",
            payload.len(),
            RLE_HEADER_SIZE
        )));
    }

    let descriptor = payload[0];
    if descriptor != 0 {
        return Err(SourceError::Decode(format!(
            "unsupported RLE payload descriptor: {descriptor} (expected 0)"
        )));
    }

    let ndims = payload[1];
    if ndims != 3 {
        return Err(SourceError::Decode(format!(
            "unsupported RLE dimension count: {ndims} (expected 3)"
        )));
    }

    let run_dim = payload[2];
    if run_dim != 0 {
        return Err(SourceError::Decode(format!(
            "unsupported RLE run dimension: {run_dim} (expected 0 = X)"
        )));
    }

    let span_count = read_u32_le(payload, 8) as usize;
    let expected = RLE_HEADER_SIZE + span_count * RLE_SPAN_SIZE;
    if payload.len() < expected {
        return Err(SourceError::Decode(format!(
            "truncated RLE payload: {} bytes, need {} for {} spans",
            payload.len(),
            expected,
            span_count
        )));
    }

    let mut spans = Vec::with_capacity(span_count);
    for i in 0..span_count {
        let off = RLE_HEADER_SIZE + i * RLE_SPAN_SIZE;
        let span = RleSpan {
            x: read_i32_le(payload, off),
            y: read_i32_le(payload, off + 4),
            z: read_i32_le(payload, off + 8),
            run: read_i32_le(payload, off + 12),
        };
        if span.run <= 0 {
            return Err(SourceError::Decode(format!(
                "RLE span {i} has non-positive run length {}",
                span.run
            )));
        }
        spans.push(span);
    }

    Ok(spans)
}

/// Bounding box of a span list, `None` when empty.
///
/// Run ends are computed in i64 so spans near the i32 coordinate limit
/// cannot wrap.
pub fn spans_bounding_box(spans: &[RleSpan]) -> Option<Box3> {
    let first = spans.first()?;
    let mut min = [first.x as i64, first.y as i64, first.z as i64];
    let mut max = [
        first.x as i64 + first.run as i64,
        first.y as i64 + 1,
        first.z as i64 + 1,
    ];

    for span in &spans[1..] {
        min[0] = min[0].min(span.x as i64);
        min[1] = min[1].min(span.y as i64);
        min[2] = min[2].min(span.z as i64);
        max[0] = max[0].max(span.x as i64 + span.run as i64);
        max[1] = max[1].max(span.y as i64 + 1);
        max[2] = max[2].max(span.z as i64 + 1);
    }

    Some(Box3::new(min, max))
}

/// Inflate spans into a dense mask covering their bounding box.
pub fn inflate(spans: &[RleSpan]) -> Result<VolumeMask, SourceError> {
    let bounds = spans_bounding_box(spans)
        .ok_or_else(|| SourceError::Decode("cannot inflate an empty span list".to_string()))?;

    if bounds.voxel_count() > MAX_INFLATED_VOXELS {
        return Err(SourceError::Decode(format!(
            "span bounding box covers {} voxels, exceeding the {} limit",
            bounds.voxel_count(),
            MAX_INFLATED_VOXELS
        )));
    }

    let mut mask = VolumeMask::empty(bounds);
    for span in spans {
        let y = (span.y as i64 - bounds.min[1]) as usize;
        let z = (span.z as i64 - bounds.min[2]) as usize;
        let x0 = (span.x as i64 - bounds.min[0]) as usize;
        for x in x0..x0 + span.run as usize {
            mask.set(x, y, z, true);
        }
    }

    Ok(mask)
}

/// Encode spans back into the wire format. Used by tests and fixtures.
pub fn encode_spans(spans: &[RleSpan]) -> Vec<u8> {
    let voxel_count: u32 = spans.iter().map(|s| s.run as u32).sum();
    let mut out = Vec::with_capacity(RLE_HEADER_SIZE + spans.len() * RLE_SPAN_SIZE);
    out.extend_from_slice(&[0, 3, 0, 0]);
    out.extend_from_slice(&voxel_count.to_le_bytes());
    out.extend_from_slice(&(spans.len() as u32).to_le_bytes());
    for span in spans {
        out.extend_from_slice(&span.x.to_le_bytes());
        out.extend_from_slice(&span.y.to_le_bytes());
        out.extend_from_slice(&span.z.to_le_bytes());
        out.extend_from_slice(&span.run.to_le_bytes());
    }
    out
}

fn read_u32_le(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

fn read_i32_le(buf: &[u8], off: usize) -> i32 {
    i32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

// =============================================================================
// Tests
// =============================================================================
