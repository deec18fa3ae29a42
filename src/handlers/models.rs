//! Model introspection handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::logic::features::FeaturePolicy;
use crate::logic::model::ArtifactSummary;
use crate::logic::RiskThresholds;
use crate::models::ApiResponse;
use crate::{AppError, AppResult, AppState};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsInfo {
    #[serde(flatten)]
    artifacts: ArtifactSummary,
    feature_policy: FeaturePolicy,
    risk_thresholds: RiskThresholds,
}

/// Loaded model names and feature schema
pub async fn info(State(state): State<AppState>) -> AppResult<Json<ApiResponse<ModelsInfo>>> {
    let artifacts = state
        .store
        .snapshot()
        .map_err(|e| AppError::from_predict(e, !state.config.is_production()))?;

    Ok(Json(ApiResponse::ok(ModelsInfo {
        artifacts: artifacts.summary(),
        feature_policy: state.predictor.builder().policy(),
        risk_thresholds: *state.classifier.thresholds(),
    })))
}
