//! Regressor trait
//!
//! Base and meta models are both plain regressors: a fixed-arity `f64`
//! input row in, a single `f64` estimate out. The backend (native JSON
//! models, ONNX Runtime) is hidden behind this trait so the ensemble never
//! cares how a model was serialized.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("expected {expected} input features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("model produced a non-finite value ({0})")]
    NonFinite(f64),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Trait for inference backends (native, ONNX, ...)
pub trait Regressor: Send + Sync {
    /// Predict a single row
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;

    /// Input arity, if the backend can declare it
    fn n_features(&self) -> Option<usize>;

    /// Backend tag for introspection ("linear", "tree_ensemble", "onnx")
    fn kind(&self) -> &'static str;
}

/// Guard shared by backends that know their arity
pub(crate) fn check_arity(expected: usize, features: &[f64]) -> Result<(), ModelError> {
    if features.len() != expected {
        return Err(ModelError::DimensionMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}
