//! plate-ngff - Convert ImageXpress plate exports into OME-NGFF plates.
//!
//! This binary parses the configuration, runs one conversion and prints the
//! summary of created paths as JSON.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plate_ngff::{Config, PipelineOrchestrator, WorkerPool};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    let request = match config.to_request() {
        Ok(request) => request,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!("  Source: {}", request.image_dir.display());
    info!(
        "  Plate: {}/{}.zarr ({}-well)",
        request.zarr_dir.display(),
        request.zarr_name,
        request.layout
    );
    info!("  Mode: {}", request.mode);
    info!(
        "  Pyramid: {} level(s), coarsening {}",
        request.pyramid.level_count(),
        request.pyramid.coarsening_xy()
    );
    info!("  Workers: {}", config.workers);

    let pool = WorkerPool::new(config.workers);
    let result = PipelineOrchestrator::new().run(&request, &pool).await;
    pool.shutdown();

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            error!("Conversion failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("Failed to encode summary: {}", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "plate_ngff=debug"
    } else {
        "plate_ngff=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
