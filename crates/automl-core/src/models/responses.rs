//! Orchestrator results handed back to callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::domain::LeaderboardEntry;
use super::record::ModelRecord;
use crate::error::AutoMlError;

/// Result of a training request.
///
/// A failed run is still a response: the record was persisted as `failed`
/// and `model_uuid` names it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_uuid: Option<String>,
    pub model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaderboard: Option<Vec<LeaderboardEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrainResponse {
    /// Create a successful response.
    pub fn completed(
        model_uuid: impl Into<String>,
        model_name: impl Into<String>,
        best_score: f64,
        best_model_name: impl Into<String>,
        leaderboard: Vec<LeaderboardEntry>,
    ) -> Self {
        Self {
            success: true,
            model_uuid: Some(model_uuid.into()),
            model_name: model_name.into(),
            best_score: Some(best_score),
            best_model_name: Some(best_model_name.into()),
            leaderboard: Some(leaderboard),
            error: None,
        }
    }

    /// Create a failed response for a recorded training attempt.
    pub fn failed(
        model_uuid: impl Into<String>,
        model_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            model_uuid: Some(model_uuid.into()),
            model_name: model_name.into(),
            best_score: None,
            best_model_name: None,
            leaderboard: None,
            error: Some(error.into()),
        }
    }
}

/// Result of a prediction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub model_uuid: String,
    pub model_name: String,
    pub target_feature: String,
    pub predictions: Vec<Value>,
    /// Per-row class probabilities; absent for regression models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<Vec<f64>>>,
}

/// A record enriched with what the backend can tell about its artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDetails {
    #[serde(flatten)]
    pub record: ModelRecord,
    #[serde(default)]
    pub feature_columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_importance: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_leaderboard: Option<Vec<LeaderboardEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_size_bytes: Option<u64>,
}

impl ModelDetails {
    /// Details with no backend enrichment.
    pub fn bare(record: ModelRecord) -> Self {
        Self {
            record,
            feature_columns: Vec::new(),
            feature_importance: None,
            detailed_leaderboard: None,
            artifact_size_bytes: None,
        }
    }
}

/// Failure envelope for a boundary layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    /// HTTP-style status code for the failure class.
    pub status: u16,
}

impl From<&AutoMlError> for ErrorResponse {
    fn from(err: &AutoMlError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            status: err.http_status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_carries_status() {
        let err = AutoMlError::ModelNotFound {
            model_id: "m9".into(),
        };
        let response = ErrorResponse::from(&err);
        assert!(!response.success);
        assert_eq!(response.status, 404);
        assert_eq!(response.error, "Model not found: m9");
    }

    #[test]
    fn test_failed_response_omits_results() {
        let response = TrainResponse::failed("abc", "churn", "Training failed: boom");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["model_uuid"], "abc");
        assert_eq!(json["error"], "Training failed: boom");
        assert!(json.get("best_score").is_none());
        assert!(json.get("leaderboard").is_none());
    }

    #[test]
    fn test_regression_prediction_omits_probabilities() {
        let response = PredictResponse {
            success: true,
            model_uuid: "m1".into(),
            model_name: "price".into(),
            target_feature: "y".into(),
            predictions: vec![serde_json::json!(1.5)],
            probabilities: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("probabilities").is_none());
        assert_eq!(json["predictions"][0], 1.5);
    }
}
