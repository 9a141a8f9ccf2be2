use thiserror::Error;

/// Errors from the segmentation data source (DVID).
///
/// These are opaque to the pipeline: no classification beyond the HTTP
/// mapping, no recovery, no retries.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Transport-level failure (connection refused, DNS, TLS, timeout).
    #[error("DVID transport error: {0}")]
    Http(String),

    /// The upstream service answered with a non-success status.
    #[error("DVID returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Malformed payload (RLE stream or repo-info JSON).
    #[error("Failed to decode DVID payload: {0}")]
    Decode(String),

    /// The repo DAG contains no committed node on the master branch.
    #[error("No master branch node found on DVID server {server}")]
    NoMasterVersion { server: String },
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Http(err.to_string())
    }
}

/// Errors from the mesh engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The mesh cannot be serialized (e.g. vertex count exceeds the format).
    #[error("Failed to serialize mesh: {0}")]
    Serialize(String),

    /// Decimation fraction outside (0, 1] (or not finite).
    #[error("Invalid decimation fraction: {0} (must be in (0, 1])")]
    InvalidFraction(f64),
}

/// Errors surfaced by the mesh generation pipeline and request handling.
///
/// Every variant aborts the whole pipeline; there is no partial mesh output.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A mandatory request parameter was absent (HTTP 400).
    #[error("Missing required parameter: {name}")]
    MissingParameter { name: &'static str },

    /// An optional parameter was present but unparseable or out of range (HTTP 400).
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// The object's bounding box exceeds the voxel budget even at the
    /// coarsest permitted level (HTTP 500).
    #[error(
        "Bounding box too large: would need resolution level {level}, \
         but the maximum level is {max_level}"
    )]
    BoundingBoxTooLarge { level: u8, max_level: u8 },

    /// The object has zero occupied voxels (HTTP 404).
    #[error("Body {body} has no occupied voxels")]
    EmptyObject { body: u64 },

    /// Failure from the data source, surfaced single-attempt (HTTP 502).
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Failure from the mesh engine (HTTP 500).
    #[error(transparent)]
    Engine(#[from] EngineError),
}
