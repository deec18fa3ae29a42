//! EWS Inference Service
//!
//! Late-payment risk scoring for cooperative savings groups. A request carries
//! a due date and an amount; the service derives the model features, runs a
//! two-level stacking ensemble and maps the score onto a risk band with
//! recommended actions.
//!
//! # Architecture
//!
//! ```text
//!   request ──► FeatureBuilder ──► base models (gb, rf) ──► meta model(s) ──► RiskClassifier
//!                     ▲                     ▲                                        │
//!                     └── ModelStore (feature columns, stats, models) ──┘            ▼
//!                                                                             PredictionResult
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod models;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::logic::features::FeatureBuilder;
use crate::logic::model::ModelStore;
use crate::logic::{EnsemblePredictor, RiskClassifier};

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ModelStore>,
    pub predictor: Arc<EnsemblePredictor>,
    pub classifier: Arc<RiskClassifier>,
    pub config: Config,
}

impl AppState {
    /// Wire the predictor to `store` using the configured feature policy
    pub fn new(store: Arc<ModelStore>, classifier: RiskClassifier, config: Config) -> Self {
        let predictor = EnsemblePredictor::new(store.clone(), FeatureBuilder::new(config.feature_policy));
        Self {
            store,
            predictor: Arc::new(predictor),
            classifier: Arc::new(classifier),
            config,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::check))
        .route("/ready", get(handlers::health::ready))
        .route("/models/info", get(handlers::models::info))
        .route("/predict", post(handlers::predict::predict))
        .route("/predict/verbose", post(handlers::predict::predict_verbose))
        .route("/predict/batch", post(handlers::predict::predict_batch))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
