//! Aquacast: Water-quality prediction service
//!
//! Main entry point for the HTTP service.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aquacast::adapters::artifacts::load_serving_artifacts;
use aquacast::adapters::http::build_router;
use aquacast::config::{load_dotenv, LogConfig, LogMode, ServiceConfig};
use aquacast::ports::SystemClock;
use aquacast::{FeatureDeriver, PredictionService};

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` must be loaded before the log settings are read.
    let dotenv = load_dotenv();
    let logging = LogConfig::from_lookup(|name| std::env::var(name).ok());

    let (writer, _guard) = match logging.mode {
        LogMode::File => {
            if let Some(parent) = logging.file.parent() {
                // Best-effort: don't fail startup just because the directory is missing.
                let _ = std::fs::create_dir_all(parent);
            }

            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&logging.file)
                .with_context(|| format!("Failed to open log file {:?}", logging.file))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stdout => tracing_appender::non_blocking(std::io::stdout()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    tracing::info!("Starting Aquacast v{}...", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv {
        tracing::info!("Loaded environment from {:?}", path);
    }

    let config = ServiceConfig::from_env()?;

    // Artifacts are loaded once; any failure here is fatal.
    let (model, scaler) = load_serving_artifacts(&config.model_dir, &config.scaler_path)?;

    let deriver = FeatureDeriver::new(config.reference_date, Arc::new(SystemClock))?;
    tracing::info!(
        "Normalization window {} .. {}",
        deriver.reference(),
        deriver.service_start()
    );

    let service = Arc::new(PredictionService::new(deriver, scaler, model));
    let app = build_router(service);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Aquacast shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
