//! Prediction pipeline errors
//!
//! Every layer of the pipeline returns `PredictResult<T>`. Failures flow
//! outward unchanged unless a layer has context to add (model name, path).

use std::path::PathBuf;

use thiserror::Error;

use super::model::ModelError;

pub type PredictResult<T> = Result<T, PredictError>;

#[derive(Debug, Error)]
pub enum PredictError {
    /// Caller-fixable input problem (bad date, non-positive amount, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Model directory or a required artifact file is missing
    #[error("artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// Artifact exists but cannot be used as-is
    #[error("artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    /// Store has not completed a successful load
    #[error("model store is not ready")]
    NotReady,

    /// A model invocation failed
    #[error("prediction failed in model '{model}': {source}")]
    PredictionFailed {
        model: String,
        #[source]
        source: ModelError,
    },
}

impl PredictError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        PredictError::InvalidInput(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        PredictError::ArtifactCorrupt(msg.into())
    }

    /// Short machine-friendly tag, used in logs and batch items
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::InvalidInput(_) => "invalid_input",
            PredictError::ArtifactNotFound(_) => "artifact_not_found",
            PredictError::ArtifactCorrupt(_) => "artifact_corrupt",
            PredictError::NotReady => "not_ready",
            PredictError::PredictionFailed { .. } => "prediction_failed",
        }
    }
}
