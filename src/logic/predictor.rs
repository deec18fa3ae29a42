//! Ensemble Predictor - two-level stacking
//!
//! ```text
//! (date, amount) ──► FeatureVector ──► base models ──► [b0, b1, ..] ──► meta models ──► mean ──► score
//! ```
//!
//! Base outputs keep the store's insertion order because the meta model was
//! trained on columns in that order. The score is returned unrounded;
//! rounding belongs to the final formatting step.

use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::error::{PredictError, PredictResult};
use super::features::FeatureBuilder;
use super::model::{ModelError, ModelStore, NamedModel};

/// Per-level diagnostics, only filled in verbose mode.
/// Model outputs are listed in artifact layout order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionDetail {
    #[serde(serialize_with = "ordered_map")]
    pub base_models: Vec<(String, f64)>,
    pub base_average: f64,
    #[serde(serialize_with = "ordered_map")]
    pub meta_models: Vec<(String, f64)>,
}

impl PredictionDetail {
    pub fn base_output(&self, name: &str) -> Option<f64> {
        find_output(&self.base_models, name)
    }

    pub fn meta_output(&self, name: &str) -> Option<f64> {
        find_output(&self.meta_models, name)
    }
}

fn find_output(outputs: &[(String, f64)], name: &str) -> Option<f64> {
    outputs.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
}

fn ordered_map<S: Serializer>(outputs: &[(String, f64)], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(outputs.len()))?;
    for (name, value) in outputs {
        map.serialize_entry(name, value)?;
    }
    map.end()
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleOutput {
    pub risk_score: f64,
    pub detail: Option<PredictionDetail>,
}

/// One item of a batch request
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionInput {
    pub date: String,
    pub amount: i64,
    #[serde(default)]
    pub verbose: bool,
}

pub struct EnsemblePredictor {
    store: Arc<ModelStore>,
    builder: FeatureBuilder,
}

fn run_model(named: &NamedModel, row: &[f64]) -> PredictResult<f64> {
    let value = named
        .model
        .predict(row)
        .and_then(|v| if v.is_finite() { Ok(v) } else { Err(ModelError::NonFinite(v)) })
        .map_err(|source| PredictError::PredictionFailed {
            model: named.name.clone(),
            source,
        })?;

    tracing::debug!(model = %named.name, prediction = value, "Model output");
    Ok(value)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

impl EnsemblePredictor {
    pub fn new(store: Arc<ModelStore>, builder: FeatureBuilder) -> Self {
        Self { store, builder }
    }

    pub fn builder(&self) -> &FeatureBuilder {
        &self.builder
    }

    /// Score one transaction
    pub fn predict(&self, date: &str, amount: i64, verbose: bool) -> PredictResult<EnsembleOutput> {
        // One snapshot for the whole request; a concurrent reload can't mix sets
        let artifacts = self.store.snapshot()?;

        let row = self.builder.build_vector(
            date,
            amount,
            artifacts.feature_names(),
            artifacts.feature_stats(),
        )?;

        // === LEVEL 0: Base Models ===
        let base_preds = artifacts
            .base_models()
            .iter()
            .map(|m| run_model(m, row.as_slice()))
            .collect::<PredictResult<Vec<f64>>>()?;

        // === LEVEL 1: Meta Models ===
        let meta_preds = artifacts
            .meta_models()
            .iter()
            .map(|m| run_model(m, &base_preds))
            .collect::<PredictResult<Vec<f64>>>()?;

        // A single meta model is the deployed configuration; averaging more
        // than one has never been exercised against real artifacts.
        let risk_score = mean(&meta_preds);

        let detail = verbose.then(|| PredictionDetail {
            base_models: named_outputs(artifacts.base_models(), &base_preds),
            base_average: mean(&base_preds),
            meta_models: named_outputs(artifacts.meta_models(), &meta_preds),
        });

        tracing::info!(date, amount, risk_score, "Prediction completed");

        Ok(EnsembleOutput { risk_score, detail })
    }

    /// Score several transactions in order.
    /// Each item succeeds or fails on its own; the output has exactly one
    /// entry per input, in input order.
    pub fn predict_batch(&self, requests: &[PredictionInput]) -> Vec<PredictResult<EnsembleOutput>> {
        let results: Vec<_> = requests
            .iter()
            .map(|r| self.predict(&r.date, r.amount, r.verbose))
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::info!(items = results.len(), failed, "Batch prediction completed");

        results
    }
}

fn named_outputs(models: &[NamedModel], values: &[f64]) -> Vec<(String, f64)> {
    models
        .iter()
        .zip(values)
        .map(|(m, v)| (m.name.clone(), *v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::{schema, FeaturePolicy};
    use crate::logic::model::{
        FeatureStats, LinearRegressor, ModelArtifactSet, ModelInfo, Regressor,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Linear model that counts its invocations
    struct Counting {
        inner: LinearRegressor,
        calls: Arc<AtomicUsize>,
    }

    impl Regressor for Counting {
        fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.predict(features)
        }

        fn n_features(&self) -> Option<usize> {
            self.inner.n_features()
        }

        fn kind(&self) -> &'static str {
            "counting"
        }
    }

    struct Failing;

    impl Regressor for Failing {
        fn predict(&self, _: &[f64]) -> Result<f64, ModelError> {
            Err(ModelError::Runtime("boom".to_string()))
        }

        fn n_features(&self) -> Option<usize> {
            None
        }

        fn kind(&self) -> &'static str {
            "failing"
        }
    }

    fn info() -> ModelInfo {
        let cols = [schema::MONTH, schema::DAY, schema::AMOUNT];
        ModelInfo {
            feature_columns: cols.iter().map(|c| c.to_string()).collect(),
            feature_stats: cols
                .iter()
                .map(|c| (c.to_string(), FeatureStats::with_mean(0.0)))
                .collect(),
        }
    }

    fn counting(coef: Vec<f64>, intercept: f64, calls: &Arc<AtomicUsize>) -> Box<dyn Regressor> {
        Box::new(Counting {
            inner: LinearRegressor::new(coef, intercept),
            calls: Arc::clone(calls),
        })
    }

    /// gb = month + day, rf = 0.0001 * amount, meta = 0.5 * gb + 0.5 * rf + 1
    fn predictor_with(meta: Vec<NamedModel>, calls: &Arc<AtomicUsize>) -> EnsemblePredictor {
        let base = vec![
            NamedModel::new("gb", counting(vec![1.0, 1.0, 0.0], 0.0, calls)),
            NamedModel::new("rf", counting(vec![0.0, 0.0, 0.0001], 0.0, calls)),
        ];
        let store = Arc::new(ModelStore::new());
        store.install(ModelArtifactSet::from_parts(base, meta, info()).unwrap());
        EnsemblePredictor::new(store, FeatureBuilder::new(FeaturePolicy::Raw))
    }

    fn default_predictor(calls: &Arc<AtomicUsize>) -> EnsemblePredictor {
        let meta = vec![NamedModel::new("meta_ridge", counting(vec![0.5, 0.5], 1.0, calls))];
        predictor_with(meta, calls)
    }

    #[test]
    fn test_two_level_composition() {
        let calls = Arc::new(AtomicUsize::new(0));
        let predictor = default_predictor(&calls);

        // gb = 1 + 15 = 16, rf = 50, meta = 8 + 25 + 1 = 34
        let out = predictor.predict("2025-01-15", 500_000, false).unwrap();
        assert!((out.risk_score - 34.0).abs() < 1e-9);
        assert!(out.detail.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_verbose_detail_shape() {
        let calls = Arc::new(AtomicUsize::new(0));
        let predictor = default_predictor(&calls);

        let detail = predictor.predict("2025-01-15", 500_000, true).unwrap().detail.unwrap();
        assert_eq!(detail.base_models.len(), 2);
        assert!((detail.base_output("gb").unwrap() - 16.0).abs() < 1e-9);
        assert!((detail.base_output("rf").unwrap() - 50.0).abs() < 1e-9);
        assert!((detail.base_average - 33.0).abs() < 1e-9);
        assert_eq!(detail.meta_models.len(), 1);
        assert!((detail.meta_output("meta_ridge").unwrap() - 34.0).abs() < 1e-9);
    }

    #[test]
    fn test_detail_lists_models_in_layout_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let meta = vec![
            NamedModel::new("meta_z", counting(vec![1.0, 0.0], 0.0, &calls)),
            NamedModel::new("meta_a", counting(vec![0.0, 1.0], 0.0, &calls)),
        ];
        let predictor = predictor_with(meta, &calls);

        let detail = predictor.predict("2025-01-15", 500_000, true).unwrap().detail.unwrap();
        let names: Vec<&str> = detail.meta_models.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["meta_z", "meta_a"]);

        let json = serde_json::to_string(&detail).unwrap();
        assert!(json.find("\"meta_z\"").unwrap() < json.find("\"meta_a\"").unwrap());
        assert!(json.find("\"gb\"").unwrap() < json.find("\"rf\"").unwrap());
    }

    #[test]
    fn test_score_is_not_rounded() {
        let calls = Arc::new(AtomicUsize::new(0));
        let predictor = default_predictor(&calls);

        // rf = 0.0001 * 123457 = 12.3457
        let out = predictor.predict("2025-01-15", 123_457, false).unwrap();
        let expected = 0.5 * 16.0 + 0.5 * 12.3457 + 1.0;
        assert!((out.risk_score - expected).abs() < 1e-9);
        assert!((out.risk_score * 100.0).fract().abs() > 1e-6);
    }

    #[test]
    fn test_repeat_predictions_are_bit_identical() {
        let calls = Arc::new(AtomicUsize::new(0));
        let predictor = default_predictor(&calls);

        let a = predictor.predict("2025-06-30", 987_654, false).unwrap();
        let b = predictor.predict("2025-06-30", 987_654, false).unwrap();
        assert_eq!(a.risk_score.to_bits(), b.risk_score.to_bits());
    }

    #[test]
    fn test_multiple_meta_models_are_averaged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let meta = vec![
            NamedModel::new("meta_a", counting(vec![1.0, 0.0], 0.0, &calls)),
            NamedModel::new("meta_b", counting(vec![0.0, 1.0], 0.0, &calls)),
        ];
        let predictor = predictor_with(meta, &calls);

        let out = predictor.predict("2025-01-15", 500_000, true).unwrap();
        assert!((out.risk_score - 33.0).abs() < 1e-9);
        assert_eq!(out.detail.unwrap().meta_models.len(), 2);
    }

    #[test]
    fn test_invalid_input_runs_no_model() {
        let calls = Arc::new(AtomicUsize::new(0));
        let predictor = default_predictor(&calls);

        for (date, amount) in [("2025-13-40", 100), ("2025-01-15", 0), ("2025-01-15", -5)] {
            let err = predictor.predict(date, amount, false).unwrap_err();
            assert!(matches!(err, PredictError::InvalidInput(_)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_not_ready_before_load() {
        let predictor = EnsemblePredictor::new(Arc::new(ModelStore::new()), FeatureBuilder::default());

        let err = predictor.predict("2025-01-15", 100, true).unwrap_err();
        assert!(matches!(err, PredictError::NotReady));

        let batch = predictor.predict_batch(&[PredictionInput {
            date: "2025-01-15".into(),
            amount: 100,
            verbose: false,
        }]);
        assert!(matches!(batch[0], Err(PredictError::NotReady)));
    }

    #[test]
    fn test_model_failure_carries_model_name() {
        let calls = Arc::new(AtomicUsize::new(0));
        let meta = vec![NamedModel::new("meta_ridge", Box::new(Failing) as Box<dyn Regressor>)];
        let predictor = predictor_with(meta, &calls);

        match predictor.predict("2025-01-15", 100, false) {
            Err(PredictError::PredictionFailed { model, source }) => {
                assert_eq!(model, "meta_ridge");
                assert!(source.to_string().contains("boom"));
            }
            other => panic!("expected PredictionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_batch_isolates_failures_and_keeps_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let predictor = default_predictor(&calls);

        let items = vec![
            PredictionInput { date: "2025-01-15".into(), amount: 500_000, verbose: false },
            PredictionInput { date: "not-a-date".into(), amount: 500_000, verbose: false },
            PredictionInput { date: "2025-01-15".into(), amount: 100_000, verbose: true },
        ];
        let results = predictor.predict_batch(&items);

        assert_eq!(results.len(), 3);
        assert!((results[0].as_ref().unwrap().risk_score - 34.0).abs() < 1e-9);
        assert!(matches!(results[1], Err(PredictError::InvalidInput(_))));
        let third = results[2].as_ref().unwrap();
        assert!(third.detail.is_some());
        // rf = 10 -> meta = 8 + 5 + 1
        assert!((third.risk_score - 14.0).abs() < 1e-9);
    }
}
