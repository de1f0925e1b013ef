//! Model lifecycle orchestration.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use super::validation::{validate_prediction_rows, validate_training_inputs, ServiceLimits};
use crate::backend::{panic_message, PredictOutcome, TrainOutcome, TrainedModel, TrainingBackend};
use crate::config::TrainingLimits;
use crate::error::{AutoMlError, Result};
use crate::models::{
    DatasetInfo, FeatureRow, ModelDetails, ModelRecord, ModelStatus, NewModelRecord,
    PredictResponse, TrainResponse, TrainingConfig,
};
use crate::repository::{ModelRepository, Reconciliation, StatusUpdate};

const INTERRUPTED_MESSAGE: &str = "Training interrupted before completion";

/// What [`ModelService::recover`] cleaned up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records left in `training` by a previous process, now `failed`.
    pub interrupted: Vec<String>,
    /// Artifact directories with no record, now removed.
    pub orphaned_artifacts: Vec<String>,
    /// Records in `training` still within their time budget, left untouched.
    pub in_progress: Vec<String>,
}

/// Coordinates the record repository and the training backend.
///
/// Every public method is synchronous and may block for the length of a
/// training run; async callers go through [`AutoMlApi`](crate::AutoMlApi).
pub struct ModelService {
    backend: Arc<dyn TrainingBackend>,
    repository: Arc<dyn ModelRepository>,
    limits: ServiceLimits,
}

impl ModelService {
    pub fn new(backend: Arc<dyn TrainingBackend>, repository: Arc<dyn ModelRepository>) -> Self {
        Self {
            backend,
            repository,
            limits: ServiceLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ServiceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> ServiceLimits {
        self.limits
    }

    /// Train a model and record the outcome.
    ///
    /// A record is written in `training` before the backend runs. A backend
    /// failure is recorded as `failed` and returned as an unsuccessful
    /// [`TrainResponse`]; only invalid input or a failing record store come
    /// back as errors.
    pub fn train(&self, dataset: &DatasetInfo, config: &TrainingConfig) -> Result<TrainResponse> {
        info!("Starting training for model: {}", config.model_name);
        validate_training_inputs(dataset, config, &self.limits)?;

        let record = self
            .repository
            .create(&NewModelRecord::from_config(config, dataset))?;
        debug!("Created training record {}", record.id);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.backend.train(dataset, config)))
            .unwrap_or_else(|payload| {
                TrainOutcome::failed(format!(
                    "Training failed: backend panicked: {}",
                    panic_message(payload.as_ref())
                ))
            });

        match outcome {
            TrainOutcome::Trained(trained) => self.finish_trained(&record, trained),
            TrainOutcome::Failed { error } => self.finish_failed(&record, error),
        }
    }

    /// Rewrite the provisional record under the backend's identifier.
    fn finish_trained(&self, record: &ModelRecord, trained: TrainedModel) -> Result<TrainResponse> {
        let model_path = trained.artifact_path.to_string_lossy().into_owned();
        let model_id = match trained.artifact_path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => trained.id.clone(),
        };
        if model_id != trained.id {
            warn!(
                "Backend reported id {} but saved to {}; using the directory name",
                trained.id, model_path
            );
        }

        let update = StatusUpdate::completed(
            Reconciliation {
                id: model_id.clone(),
                model_path,
            },
            trained.best_score,
            trained.best_model_name.clone(),
        );

        let failure = match self
            .repository
            .update_status(&record.id, ModelStatus::Completed, update)
        {
            Ok(true) => {
                info!(
                    "Training completed for model {} (tracked as {})",
                    model_id, record.id
                );
                return Ok(TrainResponse::completed(
                    model_id,
                    record.name.clone(),
                    trained.best_score,
                    trained.best_model_name,
                    trained.leaderboard,
                ));
            }
            Ok(false) => AutoMlError::persistence(format!(
                "Model record {} is no longer in training",
                record.id
            )),
            Err(e) => e,
        };

        error!(
            "Failed to record training result for {}: {}",
            record.id, failure
        );
        let note = format!("Failed to record training result: {}", failure);
        if let Err(e) =
            self.repository
                .update_status(&record.id, ModelStatus::Failed, StatusUpdate::failed(note))
        {
            warn!("Could not mark {} as failed: {}", record.id, e);
        }
        if !self.backend.delete(&model_id) {
            warn!("Could not remove orphaned artifact {}", model_id);
        }

        Err(match failure {
            AutoMlError::Persistence { .. } => failure,
            other => AutoMlError::persistence(other.to_string()),
        })
    }

    fn finish_failed(&self, record: &ModelRecord, error: String) -> Result<TrainResponse> {
        let message = if error.trim().is_empty() {
            "Training failed".to_string()
        } else {
            error
        };

        if !self.repository.update_status(
            &record.id,
            ModelStatus::Failed,
            StatusUpdate::failed(message.clone()),
        )? {
            warn!("Model record {} was not in training when marking failed", record.id);
        }
        error!("Training failed for model: {}", record.id);

        Ok(TrainResponse::failed(
            record.id.clone(),
            record.name.clone(),
            message,
        ))
    }

    /// Predict with a completed model.
    pub fn predict(&self, model_id: &str, rows: &[FeatureRow]) -> Result<PredictResponse> {
        let record = self.require(model_id)?;
        if !record.is_ready() {
            return Err(AutoMlError::NotReady {
                model_id: model_id.to_string(),
                status: record.status,
            });
        }
        validate_prediction_rows(rows, &self.limits)?;

        let outcome: PredictOutcome =
            match panic::catch_unwind(AssertUnwindSafe(|| self.backend.predict(model_id, rows))) {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    error!("Prediction failed for model {}: {}", model_id, e);
                    return Err(as_backend_failure(e));
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("Prediction panicked for model {}: {}", model_id, message);
                    return Err(AutoMlError::BackendFailure {
                        message: format!("Prediction failed: {}", message),
                    });
                }
            };

        if outcome.predictions.len() != rows.len() {
            return Err(AutoMlError::BackendFailure {
                message: format!(
                    "Backend returned {} predictions for {} rows",
                    outcome.predictions.len(),
                    rows.len()
                ),
            });
        }

        info!("Prediction completed for model: {}", model_id);
        Ok(PredictResponse {
            success: true,
            model_uuid: record.id,
            model_name: record.name,
            target_feature: record.target_feature,
            predictions: outcome.predictions,
            probabilities: outcome.probabilities,
        })
    }

    /// Delete a model's artifact and record.
    ///
    /// Returns `false` when no such record exists.
    pub fn delete(&self, model_id: &str) -> Result<bool> {
        let Some(record) = self.repository.get(model_id)? else {
            return Ok(false);
        };

        if !record.model_path.is_empty() && !self.backend.delete(&record.id) {
            warn!(
                "Artifact for {} could not be removed; deleting the record anyway",
                record.id
            );
        }

        let deleted = self.repository.delete(&record.id)?;
        if deleted {
            info!("Deleted model {} ({})", record.id, record.name);
        }
        Ok(deleted)
    }

    /// Current status, or `None` for an unknown identifier.
    pub fn get_status(&self, model_id: &str) -> Result<Option<ModelStatus>> {
        Ok(self.repository.get(model_id)?.map(|record| record.status))
    }

    /// All records, newest first.
    pub fn list_models(&self) -> Result<Vec<ModelRecord>> {
        self.repository.get_all()
    }

    /// A record plus whatever the backend can report about its artifact.
    pub fn get_model(&self, model_id: &str) -> Result<Option<ModelDetails>> {
        let Some(record) = self.repository.get(model_id)? else {
            return Ok(None);
        };

        if !record.is_ready() || record.model_path.is_empty() {
            return Ok(Some(ModelDetails::bare(record)));
        }

        let path = Path::new(&record.model_path).to_path_buf();
        let introspection =
            panic::catch_unwind(AssertUnwindSafe(|| self.backend.introspect(&path)))
                .unwrap_or_else(|payload| {
                    warn!(
                        "Introspection panicked for {}: {}",
                        record.id,
                        panic_message(payload.as_ref())
                    );
                    None
                });

        let mut details = ModelDetails::bare(record);
        if let Some(info) = introspection {
            details.feature_columns = info.feature_columns.unwrap_or_default();
            details.feature_importance = info.feature_importance;
            details.detailed_leaderboard = info.leaderboard;
            details.artifact_size_bytes = info.artifact_size_bytes;
        }
        Ok(Some(details))
    }

    /// Clean up after a process that stopped mid-training.
    ///
    /// Marks records stuck in `training` past their time limit as `failed`
    /// and removes artifact directories that no record points at and that
    /// have not been touched for longer than any run may take. Runs still
    /// within their budget, in this or another process, are left alone.
    pub fn recover(&self) -> Result<RecoveryReport> {
        self.recover_as_of(Utc::now())
    }

    /// [`recover`](Self::recover) with `now` as the reference time.
    pub fn recover_as_of(&self, now: DateTime<Utc>) -> Result<RecoveryReport> {
        let grace = Duration::seconds(TrainingLimits::RECOVERY_GRACE_SECS as i64);
        let mut report = RecoveryReport::default();

        for record in self.repository.find_by_status(ModelStatus::Training)? {
            let budget = Duration::seconds(record.time_limit as i64) + grace;
            if now - record.updated_at <= budget {
                debug!("Training {} is within its time budget; leaving it", record.id);
                report.in_progress.push(record.id);
                continue;
            }
            if self.repository.update_status(
                &record.id,
                ModelStatus::Failed,
                StatusUpdate::failed(INTERRUPTED_MESSAGE),
            )? {
                warn!("Marked interrupted training {} as failed", record.id);
                report.interrupted.push(record.id);
            }
        }

        let known: HashSet<String> = self
            .repository
            .get_all()?
            .into_iter()
            .map(|record| record.id)
            .collect();

        // An in-flight artifact has no record under its own name until
        // reconciliation, so only directories idle past the longest run go.
        let idle_after =
            Duration::seconds(self.limits.max_training_time_secs as i64) + grace;
        for artifact in self.backend.stored_artifacts()? {
            if known.contains(&artifact.id) {
                continue;
            }
            match artifact.modified {
                Some(modified) if now - modified > idle_after => {}
                _ => {
                    debug!("Artifact {} may belong to a running training; leaving it", artifact.id);
                    continue;
                }
            }
            if self.backend.delete(&artifact.id) {
                info!("Removed orphaned artifact: {}", artifact.id);
                report.orphaned_artifacts.push(artifact.id);
            } else {
                warn!("Failed to remove orphaned artifact: {}", artifact.id);
            }
        }

        if !report.interrupted.is_empty() || !report.orphaned_artifacts.is_empty() {
            info!(
                "Recovery: interrupted={}, orphaned_artifacts={}",
                report.interrupted.len(),
                report.orphaned_artifacts.len()
            );
        }
        Ok(report)
    }

    fn require(&self, model_id: &str) -> Result<ModelRecord> {
        self.repository
            .get(model_id)?
            .ok_or_else(|| AutoMlError::ModelNotFound {
                model_id: model_id.to_string(),
            })
    }
}

fn as_backend_failure(err: AutoMlError) -> AutoMlError {
    match err {
        AutoMlError::BackendFailure { .. } => err,
        other => AutoMlError::BackendFailure {
            message: format!("Prediction failed: {}", other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ModelIntrospection, StoredArtifact};
    use crate::models::LeaderboardEntry;
    use crate::repository::SqliteModelRepository;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Clone, Copy, PartialEq)]
    enum Behavior {
        Succeed,
        Fail,
        Panic,
    }

    /// Backend that names every artifact `m1` and scores 0.92.
    struct FakeBackend {
        root: PathBuf,
        behavior: Behavior,
        predict_calls: AtomicUsize,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(root: &Path, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                root: root.to_path_buf(),
                behavior,
                predict_calls: AtomicUsize::new(0),
                deleted: Mutex::new(Vec::new()),
            })
        }
    }

    impl TrainingBackend for FakeBackend {
        fn train(&self, _dataset: &DatasetInfo, _config: &TrainingConfig) -> TrainOutcome {
            let dir = self.root.join("m1");
            match self.behavior {
                Behavior::Succeed => {
                    std::fs::create_dir_all(&dir).unwrap();
                    TrainOutcome::Trained(TrainedModel {
                        id: "m1".into(),
                        artifact_path: dir,
                        best_model_name: "WeightedEnsemble_L2".into(),
                        best_score: 0.92,
                        leaderboard: vec![LeaderboardEntry {
                            model: "WeightedEnsemble_L2".into(),
                            score_val: 0.92,
                            fit_time: 1.0,
                            pred_time_val: 0.1,
                        }],
                    })
                }
                Behavior::Fail => TrainOutcome::failed("Training failed: out of memory"),
                Behavior::Panic => {
                    let _guard = crate::backend::ArtifactDirGuard::create(&dir).unwrap();
                    panic!("fit exploded");
                }
            }
        }

        fn predict(&self, _model_id: &str, rows: &[FeatureRow]) -> Result<PredictOutcome> {
            self.predict_calls.fetch_add(1, Ordering::SeqCst);
            Ok(PredictOutcome {
                predictions: rows.iter().map(|_| json!(3.5)).collect(),
                probabilities: None,
            })
        }

        fn introspect(&self, _artifact_path: &Path) -> Option<ModelIntrospection> {
            Some(ModelIntrospection {
                feature_columns: Some(vec!["a".into(), "b".into()]),
                ..ModelIntrospection::default()
            })
        }

        fn delete(&self, model_id: &str) -> bool {
            self.deleted.lock().unwrap().push(model_id.to_string());
            let _ = std::fs::remove_dir_all(self.root.join(model_id));
            true
        }

        fn stored_artifacts(&self) -> Result<Vec<StoredArtifact>> {
            Ok(std::fs::read_dir(&self.root)?
                .filter_map(|e| e.ok())
                .filter_map(|e| {
                    Some(StoredArtifact {
                        id: e.file_name().to_str()?.to_string(),
                        modified: e.metadata().and_then(|m| m.modified()).ok().map(Into::into),
                    })
                })
                .collect())
        }
    }

    /// Repository whose status updates always fail.
    struct BrokenUpdates(SqliteModelRepository);

    impl ModelRepository for BrokenUpdates {
        fn create(&self, draft: &NewModelRecord) -> Result<ModelRecord> {
            self.0.create(draft)
        }
        fn get(&self, id: &str) -> Result<Option<ModelRecord>> {
            self.0.get(id)
        }
        fn get_all(&self) -> Result<Vec<ModelRecord>> {
            self.0.get_all()
        }
        fn update_status(&self, _id: &str, _status: ModelStatus, _u: StatusUpdate) -> Result<bool> {
            Err(AutoMlError::persistence("database is locked"))
        }
        fn delete(&self, id: &str) -> Result<bool> {
            self.0.delete(id)
        }
    }

    fn dataset() -> DatasetInfo {
        DatasetInfo::new(
            "data.csv",
            vec!["a".into(), "b".into(), "y".into()],
            vec![vec![json!(1), json!(2), json!(3)], vec![json!(4), json!(5), json!(6)]],
        )
    }

    fn row(value: serde_json::Value) -> FeatureRow {
        value.as_object().cloned().unwrap()
    }

    fn service(backend: Arc<FakeBackend>) -> (ModelService, Arc<SqliteModelRepository>) {
        let repo = Arc::new(SqliteModelRepository::in_memory().unwrap());
        (ModelService::new(backend, repo.clone()), repo)
    }

    #[test]
    fn test_train_reconciles_to_backend_identifier() {
        let temp_dir = TempDir::new().unwrap();
        let (service, repo) = service(FakeBackend::new(temp_dir.path(), Behavior::Succeed));

        let response = service
            .train(&dataset(), &TrainingConfig::new("house", "y"))
            .unwrap();
        assert!(response.success);
        assert_eq!(response.model_uuid.as_deref(), Some("m1"));
        assert_eq!(response.best_score, Some(0.92));

        let records = repo.get_all().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, "m1");
        assert_eq!(record.status, ModelStatus::Completed);
        assert_eq!(record.artifact_dir_name(), Some("m1"));

        let prediction = service.predict("m1", &[row(json!({"a": 1, "b": 2}))]).unwrap();
        assert!(prediction.success);
        assert_eq!(prediction.target_feature, "y");
        assert_eq!(prediction.predictions, vec![json!(3.5)]);
        assert_eq!(service.get_status("m1").unwrap(), Some(ModelStatus::Completed));
    }

    #[test]
    fn test_missing_target_creates_no_record() {
        let temp_dir = TempDir::new().unwrap();
        let (service, repo) = service(FakeBackend::new(temp_dir.path(), Behavior::Succeed));

        let err = service
            .train(&dataset(), &TrainingConfig::new("house", "price"))
            .unwrap_err();
        assert!(matches!(err, AutoMlError::Validation { .. }));
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_backend_failure_is_recorded() {
        let temp_dir = TempDir::new().unwrap();
        let (service, repo) = service(FakeBackend::new(temp_dir.path(), Behavior::Fail));

        let response = service
            .train(&dataset(), &TrainingConfig::new("house", "y"))
            .unwrap();
        assert!(!response.success);
        let id = response.model_uuid.unwrap();

        let record = repo.get(&id).unwrap().unwrap();
        assert_eq!(record.status, ModelStatus::Failed);
        assert_eq!(
            record.error_message.as_deref(),
            Some("Training failed: out of memory")
        );
        assert!(record.model_path.is_empty());
    }

    #[test]
    fn test_backend_panic_is_recorded_without_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let (service, repo) = service(FakeBackend::new(temp_dir.path(), Behavior::Panic));

        let response = service
            .train(&dataset(), &TrainingConfig::new("house", "y"))
            .unwrap();
        assert!(!response.success);

        let records = repo.get_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ModelStatus::Failed);
        assert!(records[0]
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("fit exploded")));
        assert!(!temp_dir.path().join("m1").exists());
    }

    #[test]
    fn test_reconciliation_failure_cleans_up_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FakeBackend::new(temp_dir.path(), Behavior::Succeed);
        let repo = Arc::new(BrokenUpdates(SqliteModelRepository::in_memory().unwrap()));
        let service = ModelService::new(backend.clone(), repo.clone());

        let err = service
            .train(&dataset(), &TrainingConfig::new("house", "y"))
            .unwrap_err();
        assert!(matches!(err, AutoMlError::Persistence { .. }));
        assert_eq!(*backend.deleted.lock().unwrap(), vec!["m1".to_string()]);
        assert!(!temp_dir.path().join("m1").exists());
        assert!(repo.get("m1").unwrap().is_none());
    }

    #[test]
    fn test_predict_guards() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FakeBackend::new(temp_dir.path(), Behavior::Fail);
        let (service, repo) = service(backend.clone());

        let err = service.predict("nope", &[row(json!({"a": 1}))]).unwrap_err();
        assert!(matches!(err, AutoMlError::ModelNotFound { .. }));

        let training = repo
            .create(&NewModelRecord::from_config(
                &TrainingConfig::new("pending", "y"),
                &dataset(),
            ))
            .unwrap();
        let err = service
            .predict(&training.id, &[row(json!({"a": 1}))])
            .unwrap_err();
        assert!(matches!(
            err,
            AutoMlError::NotReady {
                status: ModelStatus::Training,
                ..
            }
        ));

        let failed = service
            .train(&dataset(), &TrainingConfig::new("house", "y"))
            .unwrap()
            .model_uuid
            .unwrap();
        let err = service.predict(&failed, &[row(json!({"a": 1}))]).unwrap_err();
        assert!(matches!(
            err,
            AutoMlError::NotReady {
                status: ModelStatus::Failed,
                ..
            }
        ));

        assert_eq!(backend.predict_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_predict_batch_limits() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _repo) = service(FakeBackend::new(temp_dir.path(), Behavior::Succeed));
        let service = service.with_limits(ServiceLimits {
            max_training_time_secs: 60,
            max_prediction_batch_size: 1,
        });
        service
            .train(&dataset(), &TrainingConfig::new("house", "y").with_time_limit(60))
            .unwrap();

        assert!(matches!(
            service.predict("m1", &[]).unwrap_err(),
            AutoMlError::Validation { .. }
        ));
        let rows = vec![row(json!({"a": 1})), row(json!({"a": 2}))];
        assert!(matches!(
            service.predict("m1", &rows).unwrap_err(),
            AutoMlError::Validation { .. }
        ));
    }

    #[test]
    fn test_delete_twice() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FakeBackend::new(temp_dir.path(), Behavior::Succeed);
        let (service, _repo) = service(backend.clone());
        service
            .train(&dataset(), &TrainingConfig::new("house", "y"))
            .unwrap();

        assert!(service.delete("m1").unwrap());
        assert!(!service.delete("m1").unwrap());
        assert_eq!(service.get_status("m1").unwrap(), None);
        assert!(!temp_dir.path().join("m1").exists());
        assert_eq!(backend.deleted.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_get_model_details() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _repo) = service(FakeBackend::new(temp_dir.path(), Behavior::Succeed));
        service
            .train(&dataset(), &TrainingConfig::new("house", "y"))
            .unwrap();

        let details = service.get_model("m1").unwrap().unwrap();
        assert_eq!(details.record.id, "m1");
        assert_eq!(details.feature_columns, vec!["a", "b"]);
        assert!(details.feature_importance.is_none());
        assert!(service.get_model("missing").unwrap().is_none());
    }

    #[test]
    fn test_recover_marks_interrupted_and_prunes_orphans() {
        let temp_dir = TempDir::new().unwrap();
        let (service, repo) = service(FakeBackend::new(temp_dir.path(), Behavior::Succeed));

        let stuck = repo
            .create(&NewModelRecord::from_config(
                &TrainingConfig::new("stuck", "y"),
                &dataset(),
            ))
            .unwrap();
        std::fs::create_dir_all(temp_dir.path().join("stray")).unwrap();

        let later = Utc::now() + Duration::days(1);
        let report = service.recover_as_of(later).unwrap();
        assert_eq!(report.interrupted, vec![stuck.id.clone()]);
        assert_eq!(report.orphaned_artifacts, vec!["stray".to_string()]);
        assert!(report.in_progress.is_empty());

        let record = repo.get(&stuck.id).unwrap().unwrap();
        assert_eq!(record.status, ModelStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some(INTERRUPTED_MESSAGE));

        assert_eq!(service.recover_as_of(later).unwrap(), RecoveryReport::default());
    }

    #[test]
    fn test_recover_leaves_live_trainings_alone() {
        let temp_dir = TempDir::new().unwrap();
        let (service, repo) = service(FakeBackend::new(temp_dir.path(), Behavior::Succeed));

        // A run in another process: provisional row plus its artifact directory
        // under the backend's own identifier.
        let running = repo
            .create(&NewModelRecord::from_config(
                &TrainingConfig::new("running", "y").with_time_limit(600),
                &dataset(),
            ))
            .unwrap();
        let in_flight = temp_dir.path().join("backend-id");
        std::fs::create_dir_all(&in_flight).unwrap();

        let report = service.recover().unwrap();
        assert_eq!(report.in_progress, vec![running.id.clone()]);
        assert!(report.interrupted.is_empty());
        assert!(report.orphaned_artifacts.is_empty());
        assert!(in_flight.exists());
        assert_eq!(
            repo.get(&running.id).unwrap().unwrap().status,
            ModelStatus::Training
        );

        // Still inside time_limit + grace a few minutes on.
        let soon = Utc::now() + Duration::seconds(600);
        let report = service.recover_as_of(soon).unwrap();
        assert_eq!(report.in_progress, vec![running.id]);
        assert!(in_flight.exists());
    }
}
