//! Error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::logic::PredictError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Validation errors
    ValidationError(String),

    // Model store not loaded yet
    NotReady,

    // Model invocation errors
    PredictionFailed { cause: String, expose: bool },

    // Generic errors
    InternalError { cause: String, expose: bool },
}

impl AppError {
    /// Map a pipeline error. `expose` controls whether the underlying cause
    /// is echoed to the caller (off in production).
    pub fn from_predict(err: PredictError, expose: bool) -> Self {
        match err {
            PredictError::InvalidInput(msg) => AppError::ValidationError(msg),
            PredictError::NotReady => AppError::NotReady,
            PredictError::PredictionFailed { .. } => AppError::PredictionFailed {
                cause: err.to_string(),
                expose,
            },
            PredictError::ArtifactNotFound(_) | PredictError::ArtifactCorrupt(_) => {
                AppError::InternalError {
                    cause: err.to_string(),
                    expose,
                }
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            AppError::PredictionFailed { .. } | AppError::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// `{success: false, error, detail?}` body, shared with batch items
    pub fn body(&self) -> serde_json::Value {
        let (error_message, detail) = match self {
            AppError::ValidationError(msg) => (msg.as_str(), None),
            AppError::NotReady => ("Models are not ready yet. Please try again later.", None),
            AppError::PredictionFailed { cause, expose } => {
                ("Prediction failed", expose.then_some(cause.as_str()))
            }
            AppError::InternalError { cause, expose } => {
                ("Internal server error", expose.then_some(cause.as_str()))
            }
        };

        let mut body = json!({
            "success": false,
            "error": error_message,
        });
        if let Some(detail) = detail {
            body["detail"] = json!(detail);
        }
        body
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::PredictionFailed { cause, .. } => {
                tracing::error!("Prediction error: {}", cause);
            }
            AppError::InternalError { cause, .. } => {
                tracing::error!("Internal error: {}", cause);
            }
            AppError::ValidationError(msg) => {
                tracing::debug!("Rejected request: {}", msg);
            }
            AppError::NotReady => {
                tracing::warn!("Request received before models were loaded");
            }
        }

        (self.status(), Json(self.body())).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::ValidationError(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::ModelError;

    fn failed() -> PredictError {
        PredictError::PredictionFailed {
            model: "gb".into(),
            source: ModelError::Runtime("bad tensor".into()),
        }
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PredictError::invalid_input("bad date"), StatusCode::BAD_REQUEST),
            (PredictError::NotReady, StatusCode::SERVICE_UNAVAILABLE),
            (failed(), StatusCode::INTERNAL_SERVER_ERROR),
            (PredictError::corrupt("no stats"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from_predict(err, true).status(), status);
        }
    }

    #[test]
    fn test_detail_hidden_when_not_exposed() {
        let open = AppError::from_predict(failed(), true).body();
        assert_eq!(open["success"], false);
        assert!(open["detail"].as_str().unwrap().contains("bad tensor"));

        let hardened = AppError::from_predict(failed(), false).body();
        assert!(hardened.get("detail").is_none());
        assert_eq!(hardened["error"], "Prediction failed");
    }

    #[test]
    fn test_validation_message_passes_through() {
        let body = AppError::from_predict(PredictError::invalid_input("amount must be greater than 0"), false).body();
        assert_eq!(body["error"], "amount must be greater than 0");
    }
}
