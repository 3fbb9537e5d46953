use anyhow::{Context, Result};
use clap::Parser;
use segserve::api::{create_router, AppState};
use segserve::{segmentation, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // Initialize logging
    let log_level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("segserve starting");
    tracing::info!("Model variant: {}", config.model_variant);
    tracing::info!("Upload limit: {} MB", config.max_upload_mb);

    // Load the predictor once; a missing model leaves the server up but not ready
    let sam_config = config.sam();
    let service = tokio::task::spawn_blocking(move || segmentation::load_service(&sam_config))
        .await
        .context("Predictor loading task failed")?;

    if service.is_ready() {
        tracing::info!("Segmentation model ready");
    } else {
        tracing::warn!("Serving without a model, segmentation routes will return 503");
    }

    let app = create_router(AppState::new(service), config.max_upload_bytes());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    tracing::info!("Listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("segserve stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
