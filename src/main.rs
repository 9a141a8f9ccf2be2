//! DVID Meshgen - a mesh generation service for DVID segmentations.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dvid_meshgen::{
    config::Config,
    mesh::NativeMesher,
    pipeline::MeshPipeline,
    server::{create_router, RouterConfig},
    source::DvidClient,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let limits = config.limits();

    info!("Configuration:");
    info!("  Voxel budget: {} voxels", limits.max_box_voxels);
    info!("  Max level: {}", limits.max_level);
    info!("  Level-0 voxel size: {} nm", limits.base_voxel_size);
    info!("  Coarse query level: {}", limits.coarse_level);

    // Outbound HTTP client, shared across requests
    let http = match reqwest::Client::builder().build() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Assemble the pipeline over its ports
    let pipeline = MeshPipeline::new(DvidClient::new(http), NativeMesher::new(), limits);

    // Build router configuration
    let mut router_config = RouterConfig::new().with_tracing(!config.no_tracing);
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    let router = create_router(pipeline, router_config);

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  dvid-meshgen v{}", env!("CARGO_PKG_VERSION"));
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl 'http://{}/?dvid=<server>&body=<id>' -o body.ngmesh",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "dvid_meshgen=debug,tower_http=debug"
    } else {
        "dvid_meshgen=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
