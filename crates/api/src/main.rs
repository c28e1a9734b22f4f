//! Generator API - HTTP service for Kubernetes manifests, Dockerfiles,
//! Helm charts and CI/CD pipelines.

use std::sync::Arc;

use anyhow::{Context, Result};
use generator_api::{serve, ApiConfig, AppState, LogFormat};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ApiConfig::load()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init(),
    }

    info!(
        port = config.api_port,
        cors_origin = %config.cors_origin,
        body_limit_bytes = config.body_limit_bytes,
        "Generator API configured"
    );

    let state = Arc::new(AppState::new(&config)?);
    serve(config.api_port, state)
        .await
        .context("API server failed")
}
