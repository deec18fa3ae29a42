//! ONNX Runtime backend
//!
//! Regressors exported with skl2onnx take a `[1, n_features]` float tensor and
//! return a `[1, 1]` float tensor. Sessions need `&mut` to run, so each one is
//! guarded by its own mutex; the rest of the artifact set stays lock-free.

use std::path::Path;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::regressor::{ModelError, Regressor};
use crate::logic::error::{PredictError, PredictResult};

pub struct OnnxRegressor {
    session: Mutex<Session>,
    output_name: String,
}

fn corrupt(path: &Path, e: impl std::fmt::Display) -> PredictError {
    PredictError::corrupt(format!("{}: {}", path.display(), e))
}

impl OnnxRegressor {
    /// Load ONNX model from file
    pub fn load(path: &Path) -> PredictResult<Self> {
        tracing::debug!(path = %path.display(), "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| corrupt(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| corrupt(path, e))?
            .commit_from_file(path)
            .map_err(|e| corrupt(path, e))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| corrupt(path, "no output defined"))?;

        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        let row: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let input_array = Array2::<f32>::from_shape_vec((1, row.len()), row)
            .map_err(|e| ModelError::Runtime(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| ModelError::Runtime(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ModelError::Runtime(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| ModelError::Runtime(format!("No output '{}'", self.output_name)))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Runtime(format!("Extract error: {}", e)))?;

        data.first()
            .map(|&v| v as f64)
            .ok_or_else(|| ModelError::Runtime("Empty output tensor".to_string()))
    }

    // Dynamic batch graphs don't pin the input arity
    fn n_features(&self) -> Option<usize> {
        None
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}
