//! Model metadata (`model_info.json`)
//!
//! Written by the training pipeline next to the model files:
//!
//! ```text
//! {
//!   "feature_columns": ["Bulan", "Hari", ...],
//!   "feature_stats": {"Bulan": {"mean": 6.4, "std": 3.4, "min": 1, "max": 12}, ...}
//! }
//! ```
//!
//! Any extra keys (training scores, timestamps) are ignored.

use std::collections::HashMap;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

/// Per-feature statistics computed on the training set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub mean: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FeatureStats {
    pub fn with_mean(mean: f64) -> Self {
        Self {
            mean,
            std: None,
            min: None,
            max: None,
        }
    }
}

pub type FeatureStatsMap = HashMap<String, FeatureStats>;

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub feature_columns: Vec<String>,
    pub feature_stats: FeatureStatsMap,
}

impl ModelInfo {
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_columns.is_empty() {
            return Err("feature_columns is empty".to_string());
        }
        if self.feature_stats.is_empty() {
            return Err("feature_stats is empty".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for name in &self.feature_columns {
            if !seen.insert(name.as_str()) {
                return Err(format!("duplicate feature column '{}'", name));
            }
        }

        for (name, stats) in &self.feature_stats {
            if !stats.mean.is_finite() {
                return Err(format!("feature_stats['{}'].mean is not finite", name));
            }
        }

        Ok(())
    }
}

/// CRC32 of the ordered feature schema.
/// Two artifact sets with the same hash expect identical input vectors.
pub fn schema_hash(feature_columns: &[String]) -> u32 {
    let mut hasher = Hasher::new();
    for name in feature_columns {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignores_extra_keys() {
        let json = r#"{
            "feature_columns": ["Bulan", "Hari"],
            "feature_stats": {"Bulan": {"mean": 6.5, "std": 3.4}, "Hari": {"mean": 15.7}},
            "best_model": "meta_ridge",
            "r2_score": 0.91
        }"#;
        let info: ModelInfo = serde_json::from_str(json).unwrap();
        assert!(info.validate().is_ok());
        assert_eq!(info.feature_stats["Bulan"].std, Some(3.4));
        assert_eq!(info.feature_stats["Hari"].std, None);
    }

    #[test]
    fn test_validate_rejects_duplicates_and_empty() {
        let info = ModelInfo {
            feature_columns: vec!["Hari".into(), "Hari".into()],
            feature_stats: [("Hari".to_string(), FeatureStats::with_mean(1.0))].into(),
        };
        assert!(info.validate().unwrap_err().contains("duplicate"));

        let info = ModelInfo {
            feature_columns: vec![],
            feature_stats: FeatureStatsMap::new(),
        };
        assert!(info.validate().is_err());
    }

    #[test]
    fn test_schema_hash_depends_on_order() {
        let a = vec!["Bulan".to_string(), "Hari".to_string()];
        let b = vec!["Hari".to_string(), "Bulan".to_string()];
        assert_eq!(schema_hash(&a), schema_hash(&a.clone()));
        assert_ne!(schema_hash(&a), schema_hash(&b));
    }
}
