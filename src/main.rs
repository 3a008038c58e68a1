use anyhow::{Context, Result};
use geocamera::api::{start_api_server, AppState};
use geocamera::{
    Config, GalleryAssembler, LocationResolver, RemoteClientGeolocator, S3ObjectStore,
    UploadPipeline, WeatherApiClient,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        "Starting GeoCamera service"
    );

    // Initialize collaborators
    let store = Arc::new(
        S3ObjectStore::new(&config.storage)
            .await
            .context("Failed to initialize object store")?,
    );

    let places = Arc::new(
        WeatherApiClient::new(&config.weather)
            .context("Failed to initialize weather API client")?,
    );

    // The service itself has no device fix; clients supply coordinates with
    // each upload, so the device geolocation path fails closed.
    let resolver = LocationResolver::new(Arc::new(RemoteClientGeolocator), places);

    let pipeline = Arc::new(UploadPipeline::new(resolver, store.clone()));
    let assembler = Arc::new(GalleryAssembler::new(store, config.storage.list_concurrency));

    let state = AppState {
        pipeline,
        assembler,
    };

    // Spawn API server task
    let api_config = config.api.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = start_api_server(state, &api_config).await {
            error!(error = %e, "API server error");
        }
    });

    info!("GeoCamera service started successfully");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down GeoCamera service");
    api_handle.abort();
    info!("GeoCamera service stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
