//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    models_loaded: bool,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        models_loaded: state.store.is_loaded(),
    })
}

/// 200 once the model store is loaded, 503 before
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.store.is_loaded() {
        (StatusCode::OK, Json(json!({ "ready": true })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "ready": false })))
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Early Warning System - late payment risk API",
        "version": env!("CARGO_PKG_VERSION"),
        "routes": [
            "POST /predict",
            "POST /predict/verbose",
            "POST /predict/batch",
            "GET /models/info",
            "GET /health",
            "GET /ready",
        ],
    }))
}
