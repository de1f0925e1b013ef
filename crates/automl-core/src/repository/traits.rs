//! Model repository trait and update types.

use crate::error::Result;
use crate::models::{ModelRecord, ModelStatus, NewModelRecord};

/// Rewrite of a record's identity once the backend has named the artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Backend-assigned identifier that replaces the provisional one.
    pub id: String,
    /// Artifact directory; its final component equals `id`.
    pub model_path: String,
}

/// Result fields written together with a terminal status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub best_score: Option<f64>,
    pub best_model_name: Option<String>,
    pub error_message: Option<String>,
    pub reconcile: Option<Reconciliation>,
}

impl StatusUpdate {
    /// Fields for a successful run, including the identity rewrite.
    pub fn completed(
        reconcile: Reconciliation,
        best_score: f64,
        best_model_name: impl Into<String>,
    ) -> Self {
        Self {
            best_score: Some(best_score),
            best_model_name: Some(best_model_name.into()),
            error_message: None,
            reconcile: Some(reconcile),
        }
    }

    /// Fields for a failed run.
    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            error_message: Some(error_message.into()),
            ..Self::default()
        }
    }
}

/// Persistence for model records, keyed by identifier.
///
/// `update_status` is the only mutation used during a lifecycle transition.
/// Implementations apply it atomically: a concurrent reader sees either the
/// `training` row or the fully written terminal row, never a mix.
pub trait ModelRepository: Send + Sync {
    /// Insert a record in the `training` state under a fresh provisional identifier.
    fn create(&self, draft: &NewModelRecord) -> Result<ModelRecord>;

    /// Get a record by identifier.
    fn get(&self, id: &str) -> Result<Option<ModelRecord>>;

    /// All records, newest first.
    fn get_all(&self) -> Result<Vec<ModelRecord>>;

    /// Move a `training` record to a terminal status and write its result fields.
    ///
    /// Returns `false` when no record with `id` is still in `training`
    /// (unknown identifier, or result fields already written).
    fn update_status(&self, id: &str, status: ModelStatus, update: StatusUpdate) -> Result<bool>;

    /// Hard-delete a record. Returns `false` if it did not exist.
    fn delete(&self, id: &str) -> Result<bool>;

    /// Records currently in `status`, newest first.
    fn find_by_status(&self, status: ModelStatus) -> Result<Vec<ModelRecord>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|record| record.status == status)
            .collect())
    }

    /// Number of records.
    fn count(&self) -> Result<usize> {
        Ok(self.get_all()?.len())
    }
}
