//! Request checks run before anything is persisted.

use crate::config::{AutoMlConfig, TrainingLimits};
use crate::error::{AutoMlError, Result};
use crate::models::{DatasetInfo, FeatureRow, TrainingConfig};

/// Upper bounds applied to requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceLimits {
    pub max_training_time_secs: u64,
    pub max_prediction_batch_size: usize,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            max_training_time_secs: TrainingLimits::MAX_TRAINING_TIME_SECS,
            max_prediction_batch_size: TrainingLimits::MAX_PREDICTION_BATCH_SIZE,
        }
    }
}

impl From<&AutoMlConfig> for ServiceLimits {
    fn from(config: &AutoMlConfig) -> Self {
        Self {
            max_training_time_secs: config.max_training_time_secs,
            max_prediction_batch_size: config.max_prediction_batch_size,
        }
    }
}

pub(crate) fn validate_training_inputs(
    dataset: &DatasetInfo,
    config: &TrainingConfig,
    limits: &ServiceLimits,
) -> Result<()> {
    if dataset.headers.is_empty() {
        return Err(AutoMlError::validation("headers", "Dataset must have headers"));
    }

    if dataset.rows.is_empty() {
        return Err(AutoMlError::validation("rows", "Dataset must have data rows"));
    }

    let target = config.target_feature.trim();
    if target.is_empty() || !dataset.headers.iter().any(|h| h.trim() == target) {
        return Err(AutoMlError::validation(
            "target_feature",
            format!(
                "Target feature '{}' not found in dataset headers",
                config.target_feature
            ),
        ));
    }

    if config.time_limit == 0 {
        return Err(AutoMlError::validation("time_limit", "Time limit must be positive"));
    }

    if config.time_limit > limits.max_training_time_secs {
        return Err(AutoMlError::validation(
            "time_limit",
            format!(
                "Time limit cannot exceed {} seconds",
                limits.max_training_time_secs
            ),
        ));
    }

    let name = config.model_name.trim();
    if name.is_empty() {
        return Err(AutoMlError::validation("model_name", "Model name cannot be empty"));
    }

    if name.chars().count() > TrainingLimits::MAX_MODEL_NAME_LEN {
        return Err(AutoMlError::validation(
            "model_name",
            format!(
                "Model name cannot exceed {} characters",
                TrainingLimits::MAX_MODEL_NAME_LEN
            ),
        ));
    }

    Ok(())
}

pub(crate) fn validate_prediction_rows(rows: &[FeatureRow], limits: &ServiceLimits) -> Result<()> {
    if rows.is_empty() {
        return Err(AutoMlError::validation(
            "data",
            "Prediction data must contain at least one row",
        ));
    }

    if rows.len() > limits.max_prediction_batch_size {
        return Err(AutoMlError::validation(
            "data",
            format!(
                "Batch size cannot exceed {} rows",
                limits.max_prediction_batch_size
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset() -> DatasetInfo {
        DatasetInfo::new(
            "data.csv",
            vec!["a".into(), "b".into(), "y".into()],
            vec![vec![json!(1), json!(2), json!(3)]],
        )
    }

    fn field(err: AutoMlError) -> String {
        match err {
            AutoMlError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {}", other),
        }
    }

    #[test]
    fn test_valid_request() {
        let config = TrainingConfig::new("house prices", "y");
        validate_training_inputs(&dataset(), &config, &ServiceLimits::default()).unwrap();
    }

    #[test]
    fn test_rejections_name_the_field() {
        let limits = ServiceLimits::default();
        let check = |dataset: &DatasetInfo, config: &TrainingConfig| {
            field(validate_training_inputs(dataset, config, &limits).unwrap_err())
        };

        let mut no_headers = dataset();
        no_headers.headers.clear();
        assert_eq!(check(&no_headers, &TrainingConfig::new("m", "y")), "headers");

        let mut no_rows = dataset();
        no_rows.rows.clear();
        assert_eq!(check(&no_rows, &TrainingConfig::new("m", "y")), "rows");

        assert_eq!(
            check(&dataset(), &TrainingConfig::new("m", "price")),
            "target_feature"
        );
        assert_eq!(
            check(&dataset(), &TrainingConfig::new("m", "y").with_time_limit(0)),
            "time_limit"
        );
        assert_eq!(
            check(&dataset(), &TrainingConfig::new("m", "y").with_time_limit(7201)),
            "time_limit"
        );
        assert_eq!(check(&dataset(), &TrainingConfig::new("   ", "y")), "model_name");
        assert_eq!(
            check(&dataset(), &TrainingConfig::new("x".repeat(256), "y")),
            "model_name"
        );
    }

    #[test]
    fn test_prediction_batch_bounds() {
        let limits = ServiceLimits {
            max_training_time_secs: 60,
            max_prediction_batch_size: 2,
        };
        let row = json!({"a": 1}).as_object().cloned().unwrap();

        assert!(validate_prediction_rows(&[], &limits).is_err());
        assert!(validate_prediction_rows(&[row.clone(), row.clone()], &limits).is_ok());
        assert!(validate_prediction_rows(&[row.clone(), row.clone(), row], &limits).is_err());
    }
}
