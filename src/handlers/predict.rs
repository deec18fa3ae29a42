//! Prediction handlers

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::{json, Value};

use crate::logic::{PredictionInput, PredictionResult};
use crate::models::{ApiResponse, BatchPredictRequest, PredictRequest};
use crate::{AppError, AppResult, AppState};

/// Score one request
fn score(state: &AppState, req: PredictRequest, verbose: bool) -> AppResult<PredictionResult> {
    req.check()?;

    let expose = !state.config.is_production();
    let output = state
        .predictor
        .predict(&req.date, req.amount, verbose)
        .map_err(|e| AppError::from_predict(e, expose))?;

    let result = state.classifier.format(
        &req.date,
        req.amount,
        req.target_type,
        req.group_id,
        output.risk_score,
        output.detail,
    );

    tracing::info!(
        date = %result.date,
        amount = result.amount,
        risk_score = result.risk_score,
        status = result.risk_category.status.as_str(),
        "Prediction successful"
    );

    Ok(result)
}

/// Predict late-payment risk
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<PredictionResult>>> {
    let Json(req) = payload?;
    Ok(Json(ApiResponse::ok(score(&state, req, false)?)))
}

/// Same as `predict`, with per-level model outputs
pub async fn predict_verbose(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<PredictionResult>>> {
    let Json(req) = payload?;
    Ok(Json(ApiResponse::ok(score(&state, req, true)?)))
}

/// Predict several requests; every item gets its own success/error entry
pub async fn predict_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchPredictRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    let Json(batch) = payload?;

    // Whole batch is unavailable before load, not N identical item errors
    if !state.store.is_loaded() {
        return Err(AppError::NotReady);
    }

    let expose = !state.config.is_production();
    let verbose = batch.verbose;

    let checked: Vec<Result<PredictRequest, AppError>> = batch
        .items
        .into_iter()
        .map(PredictRequest::from_item)
        .collect();

    let inputs: Vec<PredictionInput> = checked
        .iter()
        .filter_map(|c| c.as_ref().ok())
        .map(|item| PredictionInput {
            date: item.date.clone(),
            amount: item.amount,
            verbose,
        })
        .collect();
    let mut outputs = state.predictor.predict_batch(&inputs).into_iter();

    let data = checked
        .into_iter()
        .map(|checked| {
            let item = match checked {
                Ok(item) => item,
                Err(e) => return item_error(e),
            };
            match outputs.next() {
                Some(Ok(output)) => {
                    let result = state.classifier.format(
                        &item.date,
                        item.amount,
                        item.target_type,
                        item.group_id,
                        output.risk_score,
                        output.detail,
                    );
                    json!({ "success": true, "data": result })
                }
                Some(Err(e)) => item_error(AppError::from_predict(e, expose)),
                None => item_error(AppError::InternalError {
                    cause: "batch output missing".to_string(),
                    expose,
                }),
            }
        })
        .collect();

    Ok(Json(ApiResponse::ok(data)))
}

fn item_error(err: AppError) -> Value {
    let mut body = err.body();
    body["status"] = json!(err.status().as_u16());
    body
}
