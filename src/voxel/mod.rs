//! Voxel-space geometry for the mesh pipeline.
//!
//! This module contains the pure arithmetic the pipeline is built on:
//!
//! - [`Box3`] - integer axis-aligned bounding boxes in voxel coordinates
//! - [`PhysicalBox`] - the same boxes mapped into physical units (nanometers)
//! - [`VolumeMask`] - a dense binary occupancy mask plus its bounding box
//! - [`scale`] - resolution-level selection and decimation compensation
//!
//! Everything here is synchronous, allocation-light, and independent of the
//! data source and mesh engine.

pub mod box3;
pub mod mask;
pub mod scale;

pub use box3::{Box3, PhysicalBox};
pub use mask::VolumeMask;
pub use scale::{effective_decimation, select_level};
