//! Training backend trait and result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{DatasetInfo, FeatureRow, LeaderboardEntry, ProblemType, TrainingConfig};

/// A model the backend trained and saved.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    /// Backend-assigned identifier; the artifact directory is named after it.
    pub id: String,
    pub artifact_path: PathBuf,
    pub best_model_name: String,
    pub best_score: f64,
    /// Best candidates first.
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Outcome of a training call.
///
/// Failures are values, not errors: whatever went wrong has already been
/// cleaned up by the time the backend returns.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainOutcome {
    Trained(TrainedModel),
    Failed { error: String },
}

impl TrainOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        TrainOutcome::Failed {
            error: error.into(),
        }
    }
}

/// Predictions for a batch of rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredictOutcome {
    pub predictions: Vec<Value>,
    /// Per-row class probabilities, `None` when the model cannot produce them.
    pub probabilities: Option<Vec<Vec<f64>>>,
}

/// What a backend can report about a saved artifact.
///
/// Every field is filled independently; a piece that cannot be read is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelIntrospection {
    pub model_id: Option<String>,
    pub problem_type: Option<ProblemType>,
    pub label_column: Option<String>,
    pub eval_metric: Option<String>,
    pub feature_columns: Option<Vec<String>>,
    pub leaderboard: Option<Vec<LeaderboardEntry>>,
    pub best_model: Option<String>,
    pub best_score: Option<f64>,
    pub feature_importance: Option<BTreeMap<String, f64>>,
    pub artifact_size_bytes: Option<u64>,
}

/// An artifact directory found in the backend's store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub id: String,
    /// Last modification time, if the filesystem reports one.
    pub modified: Option<DateTime<Utc>>,
}

/// Automated training capability behind the orchestrator.
///
/// Implementations own their artifact store and any cache of loaded models.
pub trait TrainingBackend: Send + Sync {
    /// Train and save a model under a freshly generated identifier.
    ///
    /// Must not panic across this boundary; a failed run leaves no artifact
    /// directory behind.
    fn train(&self, dataset: &DatasetInfo, config: &TrainingConfig) -> TrainOutcome;

    /// Predict with a trained model, loading it if it is not cached.
    fn predict(&self, model_id: &str, rows: &[FeatureRow]) -> Result<PredictOutcome>;

    /// Describe a saved artifact. `None` when it cannot be loaded at all.
    fn introspect(&self, artifact_path: &Path) -> Option<ModelIntrospection>;

    /// Evict and remove an artifact.
    ///
    /// Idempotent. Returns `true` when nothing remains on disk.
    fn delete(&self, model_id: &str) -> bool;

    /// Every artifact directory currently stored, including ones still being written.
    fn stored_artifacts(&self) -> Result<Vec<StoredArtifact>> {
        Ok(Vec::new())
    }
}
