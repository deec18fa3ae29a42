//! EWS inference server
//!
//! Loads the model artifacts once at startup and serves risk predictions
//! over HTTP until Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ews_inference::config::Config;
use ews_inference::logic::features::FeatureBuilder;
use ews_inference::logic::model::ModelStore;
use ews_inference::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ews_inference=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("EWS inference server starting...");
    tracing::info!(
        "Model dir: {}, feature policy: {}, environment: {}",
        config.model_dir.display(),
        config.feature_policy,
        config.environment
    );

    let classifier = config.risk_classifier().context("Invalid risk configuration")?;

    // Load models; the server never starts half-ready
    let store = Arc::new(ModelStore::new());
    let artifacts = store
        .load(&config.model_dir)
        .with_context(|| format!("Failed to load models from {}", config.model_dir.display()))?;

    FeatureBuilder::new(config.feature_policy)
        .check_stats(artifacts.feature_names(), artifacts.feature_stats())
        .context("Feature statistics do not cover the configured policy")?;

    // Build application state
    let state = AppState::new(store, classifier, config.clone());
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
