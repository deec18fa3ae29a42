//! Prediction request / response models

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::logic::TargetType;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    /// Transaction date, YYYY-MM-DD
    #[validate(length(min = 1, message = "date is required"))]
    pub date: String,

    #[validate(range(min = 1, message = "amount must be greater than 0"))]
    pub amount: i64,

    pub target_type: TargetType,

    /// Required when target_type = specific_group
    #[serde(default)]
    pub group_id: Option<String>,
}

impl PredictRequest {
    /// Decode and check one batch item
    pub fn from_item(item: serde_json::Value) -> Result<Self, AppError> {
        let req: PredictRequest = serde_json::from_value(item)
            .map_err(|e| AppError::ValidationError(format!("invalid item: {}", e)))?;
        req.check()?;
        Ok(req)
    }

    /// Field rules plus the cross-field group rule
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;

        let has_group = self
            .group_id
            .as_deref()
            .map(|g| !g.trim().is_empty())
            .unwrap_or(false);

        if self.target_type == TargetType::SpecificGroup && !has_group {
            return Err(AppError::ValidationError(
                "groupId is required when targetType is specific_group".to_string(),
            ));
        }
        Ok(())
    }
}

/// Items stay raw JSON so one malformed item can't reject its siblings
#[derive(Debug, Deserialize)]
pub struct BatchPredictRequest {
    pub items: Vec<serde_json::Value>,
    #[serde(default)]
    pub verbose: bool,
}

/// `{success: true, data}` envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> PredictRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_broadcast_without_group_is_valid() {
        let req = parse(r#"{"date": "2025-01-15", "amount": 500000, "targetType": "broadcast"}"#);
        assert!(req.check().is_ok());
        assert!(req.group_id.is_none());
    }

    #[test]
    fn test_specific_group_requires_group_id() {
        let req = parse(r#"{"date": "2025-01-15", "amount": 500000, "targetType": "specific_group"}"#);
        assert!(matches!(req.check(), Err(AppError::ValidationError(_))));

        let req = parse(r#"{"date": "2025-01-15", "amount": 500000, "targetType": "specific_group", "groupId": "  "}"#);
        assert!(req.check().is_err());

        let req = parse(r#"{"date": "2025-01-15", "amount": 500000, "targetType": "specific_group", "groupId": "003"}"#);
        assert!(req.check().is_ok());
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        for amount in [0, -5] {
            let req = parse(&format!(
                r#"{{"date": "2025-01-15", "amount": {}, "targetType": "broadcast"}}"#,
                amount
            ));
            match req.check() {
                Err(AppError::ValidationError(msg)) => assert!(msg.contains("greater than 0"), "{}", msg),
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_batch_item_decode_errors_are_validation_errors() {
        let bad_target = serde_json::json!({"date": "2025-01-15", "amount": 1, "targetType": "everyone"});
        assert!(matches!(PredictRequest::from_item(bad_target), Err(AppError::ValidationError(_))));

        let amount_as_text = serde_json::json!({"date": "2025-01-15", "amount": "100", "targetType": "broadcast"});
        assert!(matches!(PredictRequest::from_item(amount_as_text), Err(AppError::ValidationError(_))));

        let good = serde_json::json!({"date": "2025-01-15", "amount": 100, "targetType": "broadcast"});
        assert_eq!(PredictRequest::from_item(good).unwrap().amount, 100);
    }

    #[test]
    fn test_unknown_target_type_fails_to_parse() {
        let res: Result<PredictRequest, _> =
            serde_json::from_str(r#"{"date": "2025-01-15", "amount": 1, "targetType": "everyone"}"#);
        assert!(res.is_err());
    }
}
