//! Configuration management for the mesh generation service.
//!
//! Supports command-line arguments via clap, environment variables with the
//! `MESHGEN_` prefix, and documented defaults for everything optional.
//!
//! # Environment Variables
//!
//! - `MESHGEN_HOST` - Server bind address (default: 0.0.0.0)
//! - `MESHGEN_PORT` - Server port (default: 8080)
//! - `MESHGEN_MAX_BOX_VOXELS` - Voxel budget for the working-level mask
//!   (default: 134217728 = 128 MiVoxels)
//! - `MESHGEN_MAX_LEVEL` - Coarsest permitted resolution level (default: 7)
//! - `MESHGEN_VOXEL_NM` - Physical size of a level-0 voxel in nanometers
//!   (default: 8.0)
//! - `MESHGEN_COARSE_LEVEL` - Resolution level of the coarse sparse-volume
//!   query (default: 6)
//! - `MESHGEN_CORS_ORIGINS` - Allowed CORS origins (comma-separated)

use clap::Parser;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default voxel budget: 128 MiVoxels.
pub const DEFAULT_MAX_BOX_VOXELS: u64 = 128 * (1 << 20);

/// Default coarsest permitted resolution level.
pub const DEFAULT_MAX_LEVEL: u8 = 7;

/// Default physical size of a level-0 voxel, in nanometers.
pub const DEFAULT_VOXEL_NM: f64 = 8.0;

/// Default resolution level of the coarse sparse-volume query.
pub const DEFAULT_COARSE_LEVEL: u8 = 6;

// =============================================================================
// CLI Arguments
// =============================================================================

/// DVID mesh generation service.
///
/// Generates a simplified surface mesh for a labeled object in a DVID
/// segmentation and stores it back into a DVID key-value instance.
#[derive(Parser, Debug, Clone)]
#[command(name = "dvid-meshgen")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "MESHGEN_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MESHGEN_PORT")]
    pub port: u16,

    // =========================================================================
    // Pipeline Limits
    // =========================================================================
    /// Maximum voxel count of the working-level bounding box.
    ///
    /// The scale selector climbs resolution levels until the object's box
    /// fits this budget.
    #[arg(long, default_value_t = DEFAULT_MAX_BOX_VOXELS, env = "MESHGEN_MAX_BOX_VOXELS")]
    pub max_box_voxels: u64,

    /// Coarsest resolution level the selector may reach.
    #[arg(long, default_value_t = DEFAULT_MAX_LEVEL, env = "MESHGEN_MAX_LEVEL")]
    pub max_level: u8,

    /// Physical size of a level-0 voxel, in nanometers.
    #[arg(long, default_value_t = DEFAULT_VOXEL_NM, env = "MESHGEN_VOXEL_NM")]
    pub voxel_nm: f64,

    /// Resolution level of DVID's coarse sparse-volume endpoint.
    #[arg(long, default_value_t = DEFAULT_COARSE_LEVEL, env = "MESHGEN_COARSE_LEVEL")]
    pub coarse_level: u8,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "MESHGEN_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_box_voxels == 0 {
            return Err("max_box_voxels must be greater than 0".to_string());
        }

        // Shift arithmetic in the coordinate mapping needs levels below 63.
        if self.max_level > 32 {
            return Err("max_level must be at most 32".to_string());
        }
        if self.coarse_level > 32 {
            return Err("coarse_level must be at most 32".to_string());
        }

        if !self.voxel_nm.is_finite() || self.voxel_nm <= 0.0 {
            return Err("voxel_nm must be a positive finite number".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Extract the limits that flow into the pipeline.
    pub fn limits(&self) -> PipelineLimits {
        PipelineLimits {
            max_box_voxels: self.max_box_voxels,
            max_level: self.max_level,
            base_voxel_size: self.voxel_nm,
            coarse_level: self.coarse_level,
        }
    }
}

// =============================================================================
// Pipeline Limits
// =============================================================================

/// Resource and resolution limits for the mesh pipeline.
///
/// Passed into the pipeline at construction so tests can run with alternate
/// budgets and voxel sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineLimits {
    /// Maximum voxel count of the working-level bounding box.
    pub max_box_voxels: u64,

    /// Coarsest resolution level the selector may reach.
    pub max_level: u8,

    /// Physical size of a level-0 voxel, in nanometers.
    pub base_voxel_size: f64,

    /// Resolution level of the coarse sparse-volume query.
    pub coarse_level: u8,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            max_box_voxels: DEFAULT_MAX_BOX_VOXELS,
            max_level: DEFAULT_MAX_LEVEL,
            base_voxel_size: DEFAULT_VOXEL_NM,
            coarse_level: DEFAULT_COARSE_LEVEL,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
