//! Feature Builder
//!
//! Turns the sparse request input (date, amount) into the named features the
//! training schema knows about. Two policies:
//!
//! - `Raw`: calendar features + amount; anything else in the schema is 0.
//! - `Historical`: `Raw` plus behavioral features taken from training-set
//!   means; anything else in the schema falls back to its historical mean.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::calendar::{parse_date, CalendarFeatures};
use super::schema;
use super::vector::{assemble_vector, DefaultPolicy, FeatureMap, FeatureVector};
use crate::logic::error::{PredictError, PredictResult};
use crate::logic::model::FeatureStatsMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeaturePolicy {
    Raw,
    #[default]
    Historical,
}

impl FromStr for FeaturePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(FeaturePolicy::Raw),
            "historical" => Ok(FeaturePolicy::Historical),
            other => Err(format!("unknown feature policy '{}' (expected raw|historical)", other)),
        }
    }
}

impl fmt::Display for FeaturePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeaturePolicy::Raw => write!(f, "raw"),
            FeaturePolicy::Historical => write!(f, "historical"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder {
    policy: FeaturePolicy,
}

impl FeatureBuilder {
    pub fn new(policy: FeaturePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FeaturePolicy {
        self.policy
    }

    /// Default applied to schema columns the builder didn't produce
    pub fn default_policy<'a>(&self, stats: &'a FeatureStatsMap) -> DefaultPolicy<'a> {
        match self.policy {
            FeaturePolicy::Raw => DefaultPolicy::Zero,
            FeaturePolicy::Historical => DefaultPolicy::HistoricalMean(stats),
        }
    }

    /// Named features for one transaction
    pub fn build_features(
        &self,
        date: &str,
        amount: i64,
        stats: &FeatureStatsMap,
    ) -> PredictResult<FeatureMap> {
        let date = parse_date(date)?;
        if amount <= 0 {
            return Err(PredictError::invalid_input(format!(
                "amount must be greater than 0 (got {})",
                amount
            )));
        }

        let mut features: FeatureMap = CalendarFeatures::from_date(date)
            .entries()
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();

        let amount = amount as f64;
        features.insert(schema::AMOUNT.to_string(), amount);
        features.insert(schema::AMOUNT_LEGACY.to_string(), amount);

        if self.policy == FeaturePolicy::Historical {
            for name in schema::BEHAVIORAL {
                let stat = stats.get(*name).ok_or_else(|| {
                    PredictError::corrupt(format!("feature_stats has no entry for '{}'", name))
                })?;
                features.insert(name.to_string(), stat.mean);
            }
        }

        tracing::debug!(%date, amount, features = features.len(), "Built features");
        Ok(features)
    }

    /// Build and project in one step
    pub fn build_vector(
        &self,
        date: &str,
        amount: i64,
        feature_names: &[String],
        stats: &FeatureStatsMap,
    ) -> PredictResult<FeatureVector> {
        let features = self.build_features(date, amount, stats)?;
        assemble_vector(&features, feature_names, self.default_policy(stats))
    }

    /// Startup check: every statistic this builder can reference exists.
    /// Surfaces a misconfigured artifact set before any request arrives.
    pub fn check_stats(&self, feature_names: &[String], stats: &FeatureStatsMap) -> PredictResult<()> {
        if self.policy == FeaturePolicy::Raw {
            return Ok(());
        }

        let produced = self.build_features("2000-01-01", 1, stats)?;
        let missing: Vec<&str> = feature_names
            .iter()
            .filter(|n| !produced.contains_key(n.as_str()) && !stats.contains_key(n.as_str()))
            .map(|n| n.as_str())
            .collect();

        if !missing.is_empty() {
            return Err(PredictError::corrupt(format!(
                "feature_stats has no entry for: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}
