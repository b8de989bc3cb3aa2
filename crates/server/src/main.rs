//! Predictor Server - machine failure prediction over HTTP
//!
//! Loads the model artifact once at startup and serves JSON predictions,
//! an HTML test form, health checks and Prometheus metrics.

use anyhow::{Context, Result};
use clap::Parser;
use predictor_lib::{PredictorMetrics, StructuredLogger};
use predictor_server::{api, load_service, LogFormat, ServerArgs, ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_NAME: &str = "predictor-server";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();
    let config = ServerConfig::load(&args)?;

    init_tracing(config.log_format);
    info!(
        model_path = %config.model_path.display(),
        schema = config.schema.as_str(),
        "Starting predictor-server"
    );

    let logger = StructuredLogger::new(SERVICE_NAME);
    let metrics = PredictorMetrics::new();

    let service = load_service(&config, &logger).await?;
    metrics.set_model(
        service.model().map(|m| m.kind()),
        service.schema().preset().as_str(),
    );

    let app_state = Arc::new(api::AppState::new(service, metrics, logger.clone()));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    logger.log_startup(SERVICE_VERSION, &addr);

    api::serve(listener, app_state, shutdown_signal()).await?;

    logger.log_shutdown("signal received");
    info!("Shutting down");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
