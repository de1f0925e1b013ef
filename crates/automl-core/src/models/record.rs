//! Persisted model records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{DatasetInfo, ModelStatus, ProblemType, TrainingConfig};

/// One persisted training attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Join key between this row, the artifact directory and the cache.
    #[serde(rename = "uuid")]
    pub id: String,
    pub name: String,
    /// Artifact directory; empty until training succeeds.
    pub model_path: String,
    pub target_feature: String,
    pub problem_type: ProblemType,
    pub time_limit: u64,
    pub eval_metric: Option<String>,
    pub presets: String,
    pub verbosity: u8,
    pub status: ModelStatus,
    pub best_score: Option<f64>,
    pub best_model_name: Option<String>,
    pub error_message: Option<String>,
    pub dataset_filename: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModelRecord {
    pub fn is_ready(&self) -> bool {
        self.status == ModelStatus::Completed
    }

    /// Final path component of `model_path`, if any.
    pub fn artifact_dir_name(&self) -> Option<&str> {
        std::path::Path::new(&self.model_path)
            .file_name()
            .and_then(|name| name.to_str())
    }
}

/// Everything needed to insert a record in the `training` state.
///
/// The repository mints the provisional identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NewModelRecord {
    pub name: String,
    pub target_feature: String,
    pub problem_type: ProblemType,
    pub time_limit: u64,
    pub eval_metric: Option<String>,
    pub presets: String,
    pub verbosity: u8,
    pub dataset_filename: Option<String>,
}

impl NewModelRecord {
    pub fn from_config(config: &TrainingConfig, dataset: &DatasetInfo) -> Self {
        Self {
            name: config.model_name.trim().to_string(),
            target_feature: config.target_feature.clone(),
            problem_type: config.problem_type,
            time_limit: config.time_limit,
            eval_metric: config.eval_metric.clone(),
            presets: config.presets.clone(),
            verbosity: config.verbosity,
            dataset_filename: Some(dataset.filename.clone()).filter(|f| !f.is_empty()),
        }
    }
}
