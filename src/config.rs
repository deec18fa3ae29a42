//! Configuration module

use std::env;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::logic::features::FeaturePolicy;
use crate::logic::risk::{GuidanceTable, RiskClassifier, RiskThresholds};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid risk thresholds: {0}")]
    Thresholds(String),

    #[error("cannot read guidance file {path}: {reason}")]
    Guidance { path: String, reason: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the model artifacts
    pub model_dir: PathBuf,

    /// Server port
    pub port: u16,

    /// Feature builder policy (raw | historical)
    pub feature_policy: FeaturePolicy,

    /// Lower bounds of MEDIUM / HIGH / CRITICAL
    pub risk_thresholds: RiskThresholds,

    /// Optional JSON file overriding the guidance wording
    pub guidance_file: Option<PathBuf>,

    /// Allowed CORS origins ("*" = any)
    pub cors_origins: Vec<String>,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str, default: f64| -> f64 {
            lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
        };
        let defaults = RiskThresholds::default();

        Self {
            model_dir: lookup("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("models_ews")),

            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            feature_policy: lookup("FEATURE_POLICY")
                .and_then(|p| match p.parse() {
                    Ok(policy) => Some(policy),
                    Err(e) => {
                        tracing::warn!("{}, using default", e);
                        None
                    }
                })
                .unwrap_or_default(),

            risk_thresholds: RiskThresholds {
                low: number("RISK_THRESHOLD_LOW", defaults.low),
                medium: number("RISK_THRESHOLD_MEDIUM", defaults.medium),
                high: number("RISK_THRESHOLD_HIGH", defaults.high),
            },

            guidance_file: lookup("RISK_GUIDANCE_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),

            cors_origins: lookup("CORS_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),

            environment: lookup("ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Build the classifier, validating thresholds and guidance wording
    pub fn risk_classifier(&self) -> Result<RiskClassifier, ConfigError> {
        self.risk_thresholds.validate().map_err(ConfigError::Thresholds)?;

        let guidance = match &self.guidance_file {
            Some(path) => {
                let err = |reason: String| ConfigError::Guidance {
                    path: path.display().to_string(),
                    reason,
                };
                let text = fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
                serde_json::from_str::<GuidanceTable>(&text).map_err(|e| err(e.to_string()))?
            }
            None => GuidanceTable::default(),
        };

        Ok(RiskClassifier::new(self.risk_thresholds, guidance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.model_dir, PathBuf::from("models_ews"));
        assert_eq!(c.port, 8080);
        assert_eq!(c.feature_policy, FeaturePolicy::Historical);
        assert_eq!(c.risk_thresholds, RiskThresholds::default());
        assert_eq!(c.cors_origins, vec!["*".to_string()]);
        assert!(!c.is_production());
        assert!(c.risk_classifier().is_ok());
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("MODEL_DIR", "/srv/models"),
            ("PORT", "9090"),
            ("FEATURE_POLICY", "raw"),
            ("RISK_THRESHOLD_LOW", "30"),
            ("RISK_THRESHOLD_MEDIUM", "60"),
            ("RISK_THRESHOLD_HIGH", "85.5"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("ENVIRONMENT", "production"),
        ]);
        assert_eq!(c.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(c.port, 9090);
        assert_eq!(c.feature_policy, FeaturePolicy::Raw);
        assert_eq!(c.risk_thresholds.high, 85.5);
        assert_eq!(c.cors_origins.len(), 2);
        assert!(c.is_production());
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let c = config(&[("PORT", "http"), ("FEATURE_POLICY", "fancy"), ("RISK_THRESHOLD_LOW", "x")]);
        assert_eq!(c.port, 8080);
        assert_eq!(c.feature_policy, FeaturePolicy::Historical);
        assert_eq!(c.risk_thresholds.low, 20.0);
    }

    #[test]
    fn test_descending_thresholds_rejected() {
        let c = config(&[("RISK_THRESHOLD_LOW", "80")]);
        assert!(matches!(c.risk_classifier(), Err(ConfigError::Thresholds(_))));
    }

    #[test]
    fn test_missing_guidance_file_rejected() {
        let c = config(&[("RISK_GUIDANCE_FILE", "/nonexistent/guidance.json")]);
        assert!(matches!(c.risk_classifier(), Err(ConfigError::Guidance { .. })));
    }
}
