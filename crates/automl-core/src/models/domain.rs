//! Training inputs and status enums shared by every layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::config::DefaultsConfig;
use crate::error::AutoMlError;

/// One prediction input row: feature name to cell value.
pub type FeatureRow = Map<String, Value>;

/// Lifecycle status of a model record.
///
/// `Training` is the only initial state. `Completed` and `Failed` are terminal
/// with respect to result fields but may still move to `Deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Training,
    Completed,
    Failed,
    Deleted,
}

impl ModelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Training => "training",
            ModelStatus::Completed => "completed",
            ModelStatus::Failed => "failed",
            ModelStatus::Deleted => "deleted",
        }
    }

    /// Whether result fields have been written.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ModelStatus::Completed | ModelStatus::Failed)
    }

    /// Check a transition against the lifecycle state machine.
    pub fn can_transition_to(&self, next: ModelStatus) -> bool {
        matches!(
            (self, next),
            (ModelStatus::Training, ModelStatus::Completed)
                | (ModelStatus::Training, ModelStatus::Failed)
                | (ModelStatus::Completed, ModelStatus::Deleted)
                | (ModelStatus::Failed, ModelStatus::Deleted)
        )
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelStatus {
    type Err = AutoMlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "training" => Ok(ModelStatus::Training),
            "completed" => Ok(ModelStatus::Completed),
            "failed" => Ok(ModelStatus::Failed),
            "deleted" => Ok(ModelStatus::Deleted),
            other => Err(AutoMlError::validation(
                "status",
                format!("unknown model status '{}'", other),
            )),
        }
    }
}

/// Kind of supervised problem a model solves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    Regression,
    Binary,
    Multiclass,
    /// Let the backend infer the problem type from the target column.
    #[default]
    Auto,
}

impl ProblemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::Regression => "regression",
            ProblemType::Binary => "binary",
            ProblemType::Multiclass => "multiclass",
            ProblemType::Auto => "auto",
        }
    }

    pub fn is_classification(&self) -> bool {
        matches!(self, ProblemType::Binary | ProblemType::Multiclass)
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProblemType {
    type Err = AutoMlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regression" => Ok(ProblemType::Regression),
            "binary" | "binary-classification" => Ok(ProblemType::Binary),
            "multiclass" | "multiclass-classification" => Ok(ProblemType::Multiclass),
            "auto" | "auto-detect" => Ok(ProblemType::Auto),
            other => Err(AutoMlError::validation(
                "problem_type",
                format!(
                    "must be one of: regression, binary, multiclass, auto (got '{}')",
                    other
                ),
            )),
        }
    }
}

/// An uploaded tabular dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub filename: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    #[serde(default)]
    pub total_rows: usize,
    #[serde(default)]
    pub file_size: u64,
}

impl DatasetInfo {
    /// Build a dataset, deriving `total_rows` from `rows`.
    pub fn new(filename: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            filename: filename.into(),
            total_rows: rows.len(),
            headers,
            rows,
            file_size: 0,
        }
    }
}

/// Configuration for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub model_name: String,
    pub target_feature: String,
    #[serde(default)]
    pub problem_type: ProblemType,
    #[serde(default = "default_time_limit")]
    pub time_limit: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_metric: Option<String>,
    #[serde(default = "default_presets")]
    pub presets: String,
    #[serde(default = "default_verbosity")]
    pub verbosity: u8,
}

fn default_time_limit() -> u64 {
    DefaultsConfig::TIME_LIMIT_SECS
}

fn default_presets() -> String {
    DefaultsConfig::PRESETS.to_string()
}

fn default_verbosity() -> u8 {
    DefaultsConfig::VERBOSITY
}

impl TrainingConfig {
    /// Create a config with default time limit, presets and verbosity.
    pub fn new(model_name: impl Into<String>, target_feature: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            target_feature: target_feature.into(),
            problem_type: ProblemType::Auto,
            time_limit: default_time_limit(),
            eval_metric: None,
            presets: default_presets(),
            verbosity: default_verbosity(),
        }
    }

    pub fn with_problem_type(mut self, problem_type: ProblemType) -> Self {
        self.problem_type = problem_type;
        self
    }

    pub fn with_time_limit(mut self, seconds: u64) -> Self {
        self.time_limit = seconds;
        self
    }

    pub fn with_eval_metric(mut self, metric: impl Into<String>) -> Self {
        self.eval_metric = Some(metric.into());
        self
    }

    pub fn with_presets(mut self, presets: impl Into<String>) -> Self {
        self.presets = presets.into();
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// One row of a training leaderboard, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub model: String,
    /// Validation score; higher is better (error metrics are negated).
    pub score_val: f64,
    /// Seconds spent fitting.
    pub fit_time: f64,
    /// Seconds spent predicting the validation rows.
    pub pred_time_val: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(ModelStatus::Training.can_transition_to(ModelStatus::Completed));
        assert!(ModelStatus::Training.can_transition_to(ModelStatus::Failed));
        assert!(ModelStatus::Failed.can_transition_to(ModelStatus::Deleted));
        assert!(!ModelStatus::Completed.can_transition_to(ModelStatus::Failed));
        assert!(!ModelStatus::Training.can_transition_to(ModelStatus::Deleted));
        assert!(!ModelStatus::Deleted.can_transition_to(ModelStatus::Training));
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            ModelStatus::Training,
            ModelStatus::Completed,
            ModelStatus::Failed,
            ModelStatus::Deleted,
        ] {
            assert_eq!(status.as_str().parse::<ModelStatus>().unwrap(), status);
        }
        assert!("archived".parse::<ModelStatus>().is_err());
    }

    #[test]
    fn test_problem_type_aliases() {
        assert_eq!(
            "binary-classification".parse::<ProblemType>().unwrap(),
            ProblemType::Binary
        );
        assert_eq!("auto-detect".parse::<ProblemType>().unwrap(), ProblemType::Auto);
        assert!("clustering".parse::<ProblemType>().is_err());
    }

    #[test]
    fn test_training_config_defaults_from_json() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{"model_name": "m", "target_feature": "y"}"#).unwrap();
        assert_eq!(config.problem_type, ProblemType::Auto);
        assert_eq!(config.time_limit, 600);
        assert_eq!(config.presets, "best_quality");
        assert_eq!(config.verbosity, 2);
        assert!(config.eval_metric.is_none());
    }
}
