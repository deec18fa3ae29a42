//! Prediction pipeline
//!
//! Leaf-first: model artifacts -> feature assembly -> ensemble -> risk bands.
//! Nothing in here knows about HTTP.

pub mod error;
pub mod features;
pub mod model;
pub mod predictor;
pub mod risk;

pub use error::{PredictError, PredictResult};
pub use predictor::{EnsembleOutput, EnsemblePredictor, PredictionDetail, PredictionInput};
pub use risk::{PredictionResult, RiskBand, RiskCategory, RiskClassifier, RiskThresholds, TargetType};
