//! Model Module - Stacking ensemble artifacts
//!
//! Regressor backends, artifact metadata and the shared store.
//! Swapping a backend never touches the predictor.

pub mod metadata;
pub mod native;
pub mod regressor;
pub mod store;

#[cfg(feature = "onnx")]
pub mod onnx;

// Re-export common types
pub use metadata::{FeatureStats, FeatureStatsMap, ModelInfo};
pub use native::{LinearRegressor, TreeEnsembleRegressor};
pub use regressor::{ModelError, Regressor};
pub use store::{ArtifactLayout, ArtifactSummary, ModelArtifactSet, ModelStore, NamedModel};
