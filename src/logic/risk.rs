//! Risk Classifier
//!
//! Maps the ensemble score onto four ordered bands. Each band's lower bound
//! is inclusive: with the default thresholds 20.0 is MEDIUM, 75.0 is CRITICAL.

use serde::{Deserialize, Serialize};

use super::predictor::PredictionDetail;

// ============================================================================
// BANDS & THRESHOLDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskBand {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "LOW",
            RiskBand::Medium => "MEDIUM",
            RiskBand::High => "HIGH",
            RiskBand::Critical => "CRITICAL",
        }
    }
}

/// Lower bounds of MEDIUM, HIGH and CRITICAL
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: 20.0,
            medium: 50.0,
            high: 75.0,
        }
    }
}

impl RiskThresholds {
    pub fn new(low: f64, medium: f64, high: f64) -> Result<Self, String> {
        let thresholds = Self { low, medium, high };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), String> {
        if ![self.low, self.medium, self.high].iter().all(|t| t.is_finite()) {
            return Err("risk thresholds must be finite".to_string());
        }
        if !(self.low < self.medium && self.medium < self.high) {
            return Err(format!(
                "risk thresholds must be strictly ascending (got {}, {}, {})",
                self.low, self.medium, self.high
            ));
        }
        Ok(())
    }

    pub fn band(&self, score: f64) -> RiskBand {
        if score < self.low {
            RiskBand::Low
        } else if score < self.medium {
            RiskBand::Medium
        } else if score < self.high {
            RiskBand::High
        } else {
            RiskBand::Critical
        }
    }
}

// ============================================================================
// GUIDANCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandGuidance {
    pub recommendation: String,
    pub guidance: Vec<String>,
}

impl BandGuidance {
    fn new(recommendation: &str, guidance: &[&str]) -> Self {
        Self {
            recommendation: recommendation.to_string(),
            guidance: guidance.iter().map(|g| g.to_string()).collect(),
        }
    }
}

/// Wording per band; loadable from JSON so deployments can localize it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceTable {
    pub low: BandGuidance,
    pub medium: BandGuidance,
    pub high: BandGuidance,
    pub critical: BandGuidance,
}

impl Default for GuidanceTable {
    fn default() -> Self {
        Self {
            low: BandGuidance::new(
                "Low risk. The transaction can proceed safely.",
                &["Continue routine monitoring"],
            ),
            medium: BandGuidance::new(
                "Medium risk. Periodic monitoring is needed.",
                &[
                    "Monitor payments periodically",
                    "Send a reminder 3 days before the due date",
                ],
            ),
            high: BandGuidance::new(
                "WARNING: high risk of late payment!",
                &[
                    "Enable automatic reminders",
                    "Follow up intensively 7 and 3 days before the due date",
                    "Consider an alternative payment method",
                ],
            ),
            critical: BandGuidance::new(
                "CRITICAL WARNING! Very high risk of late payment!",
                &[
                    "POSTPONE the transaction if possible",
                    "Follow up personally before the transaction",
                    "Prepare the collection procedure",
                    "Consider requiring payment in advance",
                ],
            ),
        }
    }
}

impl GuidanceTable {
    pub fn for_band(&self, band: RiskBand) -> &BandGuidance {
        match band {
            RiskBand::Low => &self.low,
            RiskBand::Medium => &self.medium,
            RiskBand::High => &self.high,
            RiskBand::Critical => &self.critical,
        }
    }
}

// ============================================================================
// RESULT PAYLOAD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Broadcast,
    SpecificGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskCategory {
    pub status: RiskBand,
    pub recommendation: String,
    pub guidance: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub date: String,
    pub amount: i64,
    pub target_type: TargetType,
    pub group_id: Option<String>,
    pub risk_score: f64,
    pub risk_category: RiskCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_detail: Option<PredictionDetail>,
}

/// Round to 2 decimals (final payload only)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// CLASSIFIER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    thresholds: RiskThresholds,
    guidance: GuidanceTable,
}

impl RiskClassifier {
    pub fn new(thresholds: RiskThresholds, guidance: GuidanceTable) -> Self {
        Self {
            thresholds,
            guidance,
        }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn categorize(&self, score: f64) -> RiskCategory {
        let band = self.thresholds.band(score);
        let text = self.guidance.for_band(band);

        RiskCategory {
            status: band,
            recommendation: text.recommendation.clone(),
            guidance: text.guidance.clone(),
        }
    }

    /// Compose the response payload. Banding uses the unrounded score so a
    /// 19.996 stays LOW even though it is reported as 20.0.
    pub fn format(
        &self,
        date: &str,
        amount: i64,
        target_type: TargetType,
        group_id: Option<String>,
        score: f64,
        detail: Option<PredictionDetail>,
    ) -> PredictionResult {
        PredictionResult {
            date: date.to_string(),
            amount,
            target_type,
            group_id,
            risk_score: round2(score),
            risk_category: self.categorize(score),
            prediction_detail: detail,
        }
    }
}
