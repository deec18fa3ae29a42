//! Feature Vector - projection onto the training schema
//!
//! The builder produces a sparse name -> value mapping; the models need a
//! dense row in exact training column order. `assemble_vector` is the only
//! place that crossing happens.

use std::collections::HashMap;

use crate::logic::error::{PredictError, PredictResult};
use crate::logic::model::FeatureStatsMap;

/// Sparse feature mapping produced by the builder
pub type FeatureMap = HashMap<String, f64>;

/// What a schema column gets when the mapping doesn't provide it
#[derive(Debug, Clone, Copy)]
pub enum DefaultPolicy<'a> {
    Zero,
    HistoricalMean(&'a FeatureStatsMap),
}

impl DefaultPolicy<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            DefaultPolicy::Zero => "zero",
            DefaultPolicy::HistoricalMean(_) => "historical_mean",
        }
    }
}

/// Total lookup: mapped value, else the policy default.
/// A historical-mean default with no statistics for `name` is an artifact
/// problem, not something to paper over with 0.
pub fn lookup(name: &str, mapping: &FeatureMap, policy: DefaultPolicy<'_>) -> PredictResult<f64> {
    if let Some(value) = mapping.get(name) {
        return Ok(*value);
    }

    match policy {
        DefaultPolicy::Zero => Ok(0.0),
        DefaultPolicy::HistoricalMean(stats) => stats
            .get(name)
            .map(|s| s.mean)
            .ok_or_else(|| PredictError::corrupt(format!("feature_stats has no entry for '{}'", name))),
    }
}

/// Dense row in training column order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

/// Project `features` onto `feature_names`.
/// Output length always equals `feature_names.len()`.
pub fn assemble_vector(
    features: &FeatureMap,
    feature_names: &[String],
    policy: DefaultPolicy<'_>,
) -> PredictResult<FeatureVector> {
    let values = feature_names
        .iter()
        .map(|name| lookup(name, features, policy))
        .collect::<PredictResult<Vec<f64>>>()?;

    tracing::trace!(len = values.len(), policy = policy.name(), "Assembled feature vector");

    Ok(FeatureVector { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::FeatureStats;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_order_follows_schema_not_mapping() {
        let mut map = FeatureMap::new();
        map.insert("b".into(), 2.0);
        map.insert("a".into(), 1.0);
        map.insert("unused".into(), 99.0);

        let v = assemble_vector(&map, &names(&["b", "a"]), DefaultPolicy::Zero).unwrap();
        assert_eq!(v.as_slice(), &[2.0, 1.0]);
    }

    #[test]
    fn test_zero_policy_fills_gaps() {
        let mut map = FeatureMap::new();
        map.insert("a".into(), 1.0);

        let v = assemble_vector(&map, &names(&["x", "a", "y"]), DefaultPolicy::Zero).unwrap();
        assert_eq!(v.len(), 3);
        assert_eq!(v.into_vec(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_mean_policy_uses_stats() {
        let stats: FeatureStatsMap = [("x".to_string(), FeatureStats::with_mean(4.5))].into();
        let map = FeatureMap::new();

        assert_eq!(lookup("x", &map, DefaultPolicy::HistoricalMean(&stats)).unwrap(), 4.5);
        assert!(matches!(
            lookup("y", &map, DefaultPolicy::HistoricalMean(&stats)),
            Err(PredictError::ArtifactCorrupt(_))
        ));
        assert_eq!(lookup("y", &map, DefaultPolicy::Zero).unwrap(), 0.0);
    }

    #[test]
    fn test_mapped_value_beats_default() {
        let stats: FeatureStatsMap = [("x".to_string(), FeatureStats::with_mean(4.5))].into();
        let mut map = FeatureMap::new();
        map.insert("x".into(), -1.0);

        assert_eq!(lookup("x", &map, DefaultPolicy::HistoricalMean(&stats)).unwrap(), -1.0);
    }
}
