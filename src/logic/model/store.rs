//! Model Store
//!
//! Loads the stacking ensemble from a model directory and hands out
//! read-only snapshots of it.
//!
//! ```text
//! models_ews/
//! ├── gb_regressor.{onnx|json}   base model "gb"
//! ├── rf_regressor.{onnx|json}   base model "rf"
//! ├── meta_ridge.{onnx|json}     meta model "meta_ridge"
//! └── model_info.json            feature_columns + feature_stats
//! ```
//!
//! The loaded `ModelArtifactSet` is never mutated. Loading again builds a new
//! set and swaps the shared `Arc`; readers holding the old snapshot finish on
//! it undisturbed.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::metadata::{schema_hash, FeatureStatsMap, ModelInfo};
use super::native::load_native;
use super::regressor::Regressor;
use crate::logic::error::{PredictError, PredictResult};

// ============================================================================
// ARTIFACT LAYOUT
// ============================================================================

/// Model name -> file stem inside the model directory
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    pub base_models: Vec<(String, String)>,
    pub meta_models: Vec<(String, String)>,
    pub metadata_file: String,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            base_models: vec![
                ("gb".to_string(), "gb_regressor".to_string()),
                ("rf".to_string(), "rf_regressor".to_string()),
            ],
            meta_models: vec![("meta_ridge".to_string(), "meta_ridge".to_string())],
            metadata_file: "model_info.json".to_string(),
        }
    }
}

/// Find `<stem>.onnx` or `<stem>.json`; ONNX wins when both exist
fn resolve_model_file(dir: &Path, stem: &str) -> PredictResult<PathBuf> {
    let onnx = dir.join(format!("{}.onnx", stem));
    if onnx.is_file() {
        return Ok(onnx);
    }

    let json = dir.join(format!("{}.json", stem));
    if json.is_file() {
        return Ok(json);
    }

    Err(PredictError::ArtifactNotFound(json))
}

fn load_model(path: &Path) -> PredictResult<Box<dyn Regressor>> {
    match path.extension().and_then(|e| e.to_str()) {
        #[cfg(feature = "onnx")]
        Some("onnx") => Ok(Box::new(super::onnx::OnnxRegressor::load(path)?)),
        #[cfg(not(feature = "onnx"))]
        Some("onnx") => Err(PredictError::corrupt(format!(
            "{}: built without ONNX support (enable the `onnx` feature)",
            path.display()
        ))),
        _ => load_native(path),
    }
}

fn sha256_file(path: &Path) -> PredictResult<String> {
    let bytes = fs::read(path).map_err(|e| PredictError::corrupt(format!("{}: {}", path.display(), e)))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

// ============================================================================
// ARTIFACT SET
// ============================================================================

pub struct NamedModel {
    pub name: String,
    pub model: Box<dyn Regressor>,
}

impl NamedModel {
    pub fn new(name: impl Into<String>, model: Box<dyn Regressor>) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }
}

impl fmt::Debug for NamedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedModel")
            .field("name", &self.name)
            .field("kind", &self.model.kind())
            .finish()
    }
}

/// Everything the ensemble needs, loaded once
#[derive(Debug)]
pub struct ModelArtifactSet {
    base_models: Vec<NamedModel>,
    meta_models: Vec<NamedModel>,
    feature_names: Vec<String>,
    feature_stats: FeatureStatsMap,
    checksums: BTreeMap<String, String>,
    loaded_at: DateTime<Utc>,
}

impl ModelArtifactSet {
    /// Load with the default file layout
    pub fn load(dir: &Path) -> PredictResult<Self> {
        Self::load_with_layout(dir, &ArtifactLayout::default())
    }

    pub fn load_with_layout(dir: &Path, layout: &ArtifactLayout) -> PredictResult<Self> {
        if !dir.is_dir() {
            return Err(PredictError::ArtifactNotFound(dir.to_path_buf()));
        }

        tracing::info!(dir = %dir.display(), "Loading model artifacts");

        // Resolve every file before deserializing anything
        let metadata_path = dir.join(&layout.metadata_file);
        if !metadata_path.is_file() {
            return Err(PredictError::ArtifactNotFound(metadata_path));
        }
        let base_paths = layout
            .base_models
            .iter()
            .map(|(name, stem)| -> PredictResult<(String, PathBuf)> {
                Ok((name.clone(), resolve_model_file(dir, stem)?))
            })
            .collect::<PredictResult<Vec<_>>>()?;
        let meta_paths = layout
            .meta_models
            .iter()
            .map(|(name, stem)| -> PredictResult<(String, PathBuf)> {
                Ok((name.clone(), resolve_model_file(dir, stem)?))
            })
            .collect::<PredictResult<Vec<_>>>()?;

        let mut checksums = BTreeMap::new();
        let mut load_level = |paths: Vec<(String, PathBuf)>| -> PredictResult<Vec<NamedModel>> {
            let mut models = Vec::with_capacity(paths.len());
            for (name, path) in paths {
                let model = load_model(&path)?;
                tracing::debug!(model = %name, kind = model.kind(), path = %path.display(), "Model loaded");
                checksums.insert(file_name(&path), sha256_file(&path)?);
                models.push(NamedModel::new(name, model));
            }
            Ok(models)
        };

        let base_models = load_level(base_paths)?;
        tracing::info!("✓ Loaded {} base models", base_models.len());
        let meta_models = load_level(meta_paths)?;
        tracing::info!("✓ Loaded {} meta models", meta_models.len());

        let text = fs::read_to_string(&metadata_path)
            .map_err(|e| PredictError::corrupt(format!("{}: {}", metadata_path.display(), e)))?;
        let info: ModelInfo = serde_json::from_str(&text)
            .map_err(|e| PredictError::corrupt(format!("{}: {}", metadata_path.display(), e)))?;
        checksums.insert(file_name(&metadata_path), sha256_file(&metadata_path)?);

        let mut set = Self::from_parts(base_models, meta_models, info)?;
        set.checksums = checksums;

        tracing::info!(
            features = set.feature_names.len(),
            schema_hash = %format!("{:08x}", set.schema_hash()),
            "✓ Loaded model info"
        );

        Ok(set)
    }

    /// Assemble a set from already-constructed models, enforcing the
    /// consistency invariants between the levels and the feature schema.
    pub fn from_parts(
        base_models: Vec<NamedModel>,
        meta_models: Vec<NamedModel>,
        info: ModelInfo,
    ) -> PredictResult<Self> {
        info.validate().map_err(PredictError::corrupt)?;

        if base_models.is_empty() {
            return Err(PredictError::corrupt("no base models"));
        }
        if meta_models.is_empty() {
            return Err(PredictError::corrupt("no meta models"));
        }

        for level in [&base_models, &meta_models] {
            let mut seen = std::collections::HashSet::new();
            for m in level.iter() {
                if !seen.insert(m.name.as_str()) {
                    return Err(PredictError::corrupt(format!("duplicate model name '{}'", m.name)));
                }
            }
        }

        let n_features = info.feature_columns.len();
        for base in &base_models {
            if let Some(arity) = base.model.n_features() {
                if arity != n_features {
                    return Err(PredictError::corrupt(format!(
                        "base model '{}' expects {} features, schema has {}",
                        base.name, arity, n_features
                    )));
                }
            }
        }

        for meta in &meta_models {
            if let Some(arity) = meta.model.n_features() {
                if arity != base_models.len() {
                    return Err(PredictError::corrupt(format!(
                        "meta model '{}' expects {} inputs, there are {} base models",
                        meta.name,
                        arity,
                        base_models.len()
                    )));
                }
            }
        }

        Ok(Self {
            base_models,
            meta_models,
            feature_names: info.feature_columns,
            feature_stats: info.feature_stats,
            checksums: BTreeMap::new(),
            loaded_at: Utc::now(),
        })
    }

    pub fn base_models(&self) -> &[NamedModel] {
        &self.base_models
    }

    pub fn meta_models(&self) -> &[NamedModel] {
        &self.meta_models
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature_stats(&self) -> &FeatureStatsMap {
        &self.feature_stats
    }

    pub fn schema_hash(&self) -> u32 {
        schema_hash(&self.feature_names)
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            base_models: self.base_models.iter().map(|m| m.name.clone()).collect(),
            meta_models: self.meta_models.iter().map(|m| m.name.clone()).collect(),
            total_features: self.feature_names.len(),
            feature_columns: self.feature_names.clone(),
            schema_hash: format!("{:08x}", self.schema_hash()),
            checksums: self.checksums.clone(),
            loaded_at: self.loaded_at,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Introspection view of a loaded set
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub base_models: Vec<String>,
    pub meta_models: Vec<String>,
    pub total_features: usize,
    pub feature_columns: Vec<String>,
    pub schema_hash: String,
    pub checksums: BTreeMap<String, String>,
    pub loaded_at: DateTime<Utc>,
}

// ============================================================================
// STORE
// ============================================================================

/// Shared handle to the current artifact set.
///
/// `ready` flips only after a complete set is installed, so a reader that
/// sees `true` always finds a set behind the lock.
#[derive(Default)]
pub struct ModelStore {
    ready: AtomicBool,
    current: RwLock<Option<Arc<ModelArtifactSet>>>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `dir` and install. On failure the store keeps whatever it
    /// was serving before (nothing, or the previous set).
    pub fn load(&self, dir: &Path) -> PredictResult<Arc<ModelArtifactSet>> {
        let set = ModelArtifactSet::load(dir)?;
        Ok(self.install(set))
    }

    /// Swap in a fully constructed set
    pub fn install(&self, set: ModelArtifactSet) -> Arc<ModelArtifactSet> {
        let set = Arc::new(set);
        *self.current.write() = Some(Arc::clone(&set));
        self.ready.store(true, Ordering::Release);
        set
    }

    pub fn is_loaded(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Current set, or `NotReady`
    pub fn snapshot(&self) -> PredictResult<Arc<ModelArtifactSet>> {
        if !self.is_loaded() {
            return Err(PredictError::NotReady);
        }
        self.current.read().clone().ok_or(PredictError::NotReady)
    }

    pub fn base_model_names(&self) -> PredictResult<Vec<String>> {
        Ok(self.snapshot()?.base_models().iter().map(|m| m.name.clone()).collect())
    }

    pub fn meta_model_names(&self) -> PredictResult<Vec<String>> {
        Ok(self.snapshot()?.meta_models().iter().map(|m| m.name.clone()).collect())
    }

    pub fn feature_names(&self) -> PredictResult<Vec<String>> {
        Ok(self.snapshot()?.feature_names().to_vec())
    }

    pub fn feature_stats(&self) -> PredictResult<FeatureStatsMap> {
        Ok(self.snapshot()?.feature_stats().clone())
    }
}
