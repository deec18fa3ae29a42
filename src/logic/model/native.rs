//! Native model format
//!
//! Portable JSON serialization for the two model families the stacking
//! ensemble uses:
//!
//! ```text
//! {"kind": "linear", "coefficients": [..], "intercept": 0.0}
//! {"kind": "tree_ensemble", "n_features": 24, "aggregation": "sum",
//!  "base_score": 0.0, "learning_rate": 0.1,
//!  "trees": [{"nodes": [{"feature": 0, "threshold": 6.5, "left": 1, "right": 2},
//!                       {"value": 12.0}, {"value": 30.0}]}]}
//! ```
//!
//! Trees are flat node arrays in pre-order: children always come after their
//! parent, which rules out cycles. A split sends a row left when
//! `x[feature] <= threshold`.

use std::fs;
use std::path::Path;

use ndarray::{Array1, ArrayView1};
use serde::Deserialize;

use super::regressor::{check_arity, ModelError, Regressor};
use crate::logic::error::{PredictError, PredictResult};

// ============================================================================
// FILE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum NativeModelSpec {
    Linear(LinearSpec),
    TreeEnsemble(TreeEnsembleSpec),
}

#[derive(Debug, Deserialize)]
struct LinearSpec {
    coefficients: Vec<f64>,
    #[serde(default)]
    intercept: f64,
}

#[derive(Debug, Deserialize)]
struct TreeEnsembleSpec {
    n_features: usize,
    #[serde(default)]
    aggregation: Aggregation,
    #[serde(default)]
    base_score: f64,
    #[serde(default = "default_learning_rate")]
    learning_rate: f64,
    trees: Vec<Tree>,
}

fn default_learning_rate() -> f64 {
    1.0
}

/// How per-tree outputs are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Boosting: base_score + learning_rate * sum(trees)
    #[default]
    Sum,
    /// Bagging: base_score + learning_rate * mean(trees)
    Mean,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

// ============================================================================
// LINEAR
// ============================================================================

/// `y = w·x + b` (Ridge / OLS meta learners)
#[derive(Debug, Clone)]
pub struct LinearRegressor {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearRegressor {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients: Array1::from(coefficients),
            intercept,
        }
    }
}

impl Regressor for LinearRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_arity(self.coefficients.len(), features)?;
        Ok(self.coefficients.dot(&ArrayView1::from(features)) + self.intercept)
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

// ============================================================================
// TREE ENSEMBLE
// ============================================================================

/// Gradient boosted or bagged regression trees
#[derive(Debug, Clone)]
pub struct TreeEnsembleRegressor {
    n_features: usize,
    aggregation: Aggregation,
    base_score: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
}

impl TreeEnsembleRegressor {
    fn from_spec(spec: TreeEnsembleSpec) -> Result<Self, String> {
        if spec.trees.is_empty() {
            return Err("tree ensemble has no trees".to_string());
        }

        for (t, tree) in spec.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {} has no nodes", t));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                if let Node::Split { feature, left, right, threshold } = node {
                    if *feature >= spec.n_features {
                        return Err(format!(
                            "tree {} node {}: feature {} out of range (n_features = {})",
                            t, i, feature, spec.n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("tree {} node {}: non-finite threshold", t, i));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= tree.nodes.len() {
                            return Err(format!(
                                "tree {} node {}: invalid child index {}",
                                t, i, child
                            ));
                        }
                    }
                }
            }
        }

        Ok(Self {
            n_features: spec.n_features,
            aggregation: spec.aggregation,
            base_score: spec.base_score,
            learning_rate: spec.learning_rate,
            trees: spec.trees,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Tree {
    fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if features[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

impl Regressor for TreeEnsembleRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_arity(self.n_features, features)?;

        let total: f64 = self.trees.iter().map(|t| t.evaluate(features)).sum();
        let combined = match self.aggregation {
            Aggregation::Sum => total,
            Aggregation::Mean => total / self.trees.len() as f64,
        };

        Ok(self.base_score + self.learning_rate * combined)
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn kind(&self) -> &'static str {
        "tree_ensemble"
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Parse a native model from JSON text
pub fn parse_native(json: &str) -> Result<Box<dyn Regressor>, String> {
    let spec: NativeModelSpec = serde_json::from_str(json).map_err(|e| e.to_string())?;

    match spec {
        NativeModelSpec::Linear(linear) => {
            if linear.coefficients.is_empty() {
                return Err("linear model has no coefficients".to_string());
            }
            Ok(Box::new(LinearRegressor::new(linear.coefficients, linear.intercept)))
        }
        NativeModelSpec::TreeEnsemble(spec) => Ok(Box::new(TreeEnsembleRegressor::from_spec(spec)?)),
    }
}

/// Load a native model file
pub fn load_native(path: &Path) -> PredictResult<Box<dyn Regressor>> {
    let text = fs::read_to_string(path)
        .map_err(|e| PredictError::corrupt(format!("{}: {}", path.display(), e)))?;

    parse_native(&text).map_err(|e| PredictError::corrupt(format!("{}: {}", path.display(), e)))
}
