//! Segmentation data source layer.
//!
//! The pipeline talks to the remote segmentation store through the
//! [`VolumeSource`] port; [`DvidClient`] is the concrete HTTP adapter for a
//! DVID server. Tests substitute deterministic stubs for the port.

pub mod dvid;
pub mod rle;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SourceError;
use crate::voxel::{Box3, VolumeMask};

pub use dvid::DvidClient;
pub use rle::RleSpan;

/// Per-request context forwarded on every outbound call.
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// Base URL (or host) of the data source server.
    pub server: String,

    /// Requesting principal, forwarded for auditing.
    pub user: String,

    /// Inbound `Authorization` header value, forwarded verbatim when present.
    pub authorization: Option<String>,
}

/// A run-length-encoded occupancy summary of an object at the coarsest
/// queryable resolution level.
///
/// Produced once per request by the data source; consumed only for its
/// bounding box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoarseExtent {
    spans: Vec<RleSpan>,
}

impl CoarseExtent {
    pub fn new(spans: Vec<RleSpan>) -> Self {
        Self { spans }
    }

    /// Reduce the spans to their bounding box in the coarse level's voxel
    /// coordinates. `None` when the object has zero occupied voxels.
    pub fn bounding_box(&self) -> Option<Box3> {
        rle::spans_bounding_box(&self.spans)
    }

    pub fn spans(&self) -> &[RleSpan] {
        &self.spans
    }
}

/// Port to the remote segmentation store.
///
/// Four operations, all single-attempt: the pipeline performs no retries and
/// surfaces any failure directly to the caller.
#[async_trait]
pub trait VolumeSource: Send + Sync {
    /// Resolve the latest committed version on the server's master branch.
    async fn latest_version(&self, ctx: &SourceContext) -> Result<String, SourceError>;

    /// Fetch the coarse sparse-volume summary for an object.
    async fn coarse_extent(
        &self,
        ctx: &SourceContext,
        version: &str,
        segmentation: &str,
        body: u64,
    ) -> Result<CoarseExtent, SourceError>;

    /// Fetch the dense binary mask for an object at a resolution level.
    ///
    /// The single most expensive call in the pipeline.
    async fn fetch_mask(
        &self,
        ctx: &SourceContext,
        version: &str,
        segmentation: &str,
        body: u64,
        level: u8,
    ) -> Result<VolumeMask, SourceError>;

    /// Write serialized mesh bytes under `key` in a key-value instance.
    async fn store_mesh(
        &self,
        ctx: &SourceContext,
        version: &str,
        store: &str,
        key: &str,
        bytes: Bytes,
    ) -> Result<(), SourceError>;
}
