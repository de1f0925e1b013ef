//! Bundled training backend.
//!
//! Fits a handful of small candidate models, keeps the best one, and saves it
//! under `<models_dir>/<id>/`. Loaded predictors stay in an [`ArtifactCache`]
//! until the model is deleted.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::artifact::{dir_size, read_json, write_json_atomic, ArtifactDirGuard, Manifest};
use super::cache::ArtifactCache;
use super::panic_message;
use super::tabular::{
    holdout_split, permutation_importance, resolve_problem_type, CandidateKind, EvalMetric,
    FeatureSchema, PreparedFrame, Predictor, TargetValues,
};
use super::traits::{
    ModelIntrospection, PredictOutcome, StoredArtifact, TrainOutcome, TrainedModel,
    TrainingBackend,
};
use crate::config::{ArtifactConfig, TabularConfig};
use crate::error::{AutoMlError, Result};
use crate::models::{DatasetInfo, FeatureRow, LeaderboardEntry, TrainingConfig};

/// Local tabular training backend.
pub struct LocalTabularBackend {
    models_dir: PathBuf,
    cache: ArtifactCache<Predictor>,
}

impl LocalTabularBackend {
    /// Create a backend storing artifacts under `models_dir`.
    ///
    /// The directory will be created if it doesn't exist.
    pub fn new(models_dir: impl Into<PathBuf>) -> Result<Self> {
        let models_dir = models_dir.into();
        if !models_dir.exists() {
            fs::create_dir_all(&models_dir).map_err(|e| AutoMlError::Io {
                message: format!("Failed to create models directory: {}", e),
                path: Some(models_dir.clone()),
                source: Some(e),
            })?;
        }
        info!("Models base path set to: {}", models_dir.display());

        Ok(Self {
            models_dir,
            cache: ArtifactCache::new(),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Number of predictors currently held in memory.
    pub fn cached_models(&self) -> usize {
        self.cache.len()
    }

    fn artifact_dir(&self, model_id: &str) -> PathBuf {
        self.models_dir.join(model_id)
    }

    /// Load a predictor from its artifact directory, verifying the manifest.
    fn load_predictor(dir: &Path) -> Result<Predictor> {
        let manifest: Manifest = read_json(&dir.join(ArtifactConfig::MANIFEST_FILENAME))?
            .ok_or_else(|| AutoMlError::BackendFailure {
                message: format!("No artifact manifest in {}", dir.display()),
            })?;
        manifest.verify(dir)?;

        read_json(&dir.join(ArtifactConfig::PREDICTOR_FILENAME))?.ok_or_else(|| {
            AutoMlError::BackendFailure {
                message: format!("No predictor in {}", dir.display()),
            }
        })
    }

    /// Cached predictor for `model_id`, loading it from disk on a miss.
    fn predictor(&self, model_id: &str) -> Result<Arc<Predictor>> {
        let dir = self.artifact_dir(model_id);
        self.cache.get_or_load(model_id, || {
            if !dir.is_dir() {
                return Err(AutoMlError::BackendFailure {
                    message: format!("Model path does not exist: {}", dir.display()),
                });
            }
            info!("Loading model {} from {}", model_id, dir.display());
            Self::load_predictor(&dir)
        })
    }

    fn fit_and_save(
        &self,
        model_id: &str,
        dir: &Path,
        dataset: &DatasetInfo,
        config: &TrainingConfig,
    ) -> Result<TrainedModel> {
        let started = Instant::now();
        let deadline = started + Duration::from_secs(config.time_limit);

        let frame = PreparedFrame::from_dataset(dataset, &config.target_feature)?;
        let problem_type =
            resolve_problem_type(config.problem_type, &frame.label, &frame.target)?;
        let metric = EvalMetric::resolve(config.eval_metric.as_deref(), problem_type)?;
        let candidates = CandidateKind::for_presets(&config.presets, problem_type)?;
        let (target, classes) = TargetValues::encode(problem_type, &frame.label, &frame.target)?;

        info!(
            "Training model {}: {} rows, {} features, {} / {}",
            model_id,
            frame.len(),
            frame.feature_names.len(),
            problem_type,
            metric.as_str()
        );

        let (train_idx, val_idx) = holdout_split(frame.len(), TabularConfig::RANDOM_SEED);
        let train_rows = frame.select_rows(&train_idx);
        let val_rows = frame.select_rows(&val_idx);
        let y_train = target.select(&train_idx);
        let y_val = target.select(&val_idx);

        let schema = FeatureSchema::fit(&frame.feature_names, &train_rows);
        let x_train = schema.encode_rows(&train_rows);
        let x_val = schema.encode_rows(&val_rows);

        let mut fitted = Vec::new();
        for (i, kind) in candidates.iter().enumerate() {
            if i > 0 && Instant::now() >= deadline {
                info!(
                    "Time limit of {}s reached, skipping remaining {} candidates",
                    config.time_limit,
                    candidates.len() - i
                );
                break;
            }

            let fit_start = Instant::now();
            let Some(estimator) = kind.fit(&x_train, &y_train) else {
                warn!("Candidate {} does not support {}", kind.name(), problem_type);
                continue;
            };
            let fit_time = fit_start.elapsed().as_secs_f64();

            let pred_start = Instant::now();
            let prediction = estimator.predict(&x_val);
            let pred_time_val = pred_start.elapsed().as_secs_f64();
            let score_val = metric.score(&y_val, &prediction);

            if config.verbosity >= 3 {
                info!("Fitted {}: score_val={:.4} in {:.3}s", kind.name(), score_val, fit_time);
            } else {
                debug!("Fitted {}: score_val={:.4} in {:.3}s", kind.name(), score_val, fit_time);
            }

            fitted.push((
                LeaderboardEntry {
                    model: kind.name().to_string(),
                    score_val,
                    fit_time,
                    pred_time_val,
                },
                estimator,
            ));
        }

        let fitted = rank_candidates(fitted);
        let leaderboard: Vec<LeaderboardEntry> = fitted.iter().map(|(e, _)| e.clone()).collect();
        let (best_entry, best_estimator) =
            fitted.into_iter().next().ok_or_else(|| AutoMlError::BackendFailure {
                message: "No candidate model could be fitted".to_string(),
            })?;

        let predictor = Predictor {
            format_version: ArtifactConfig::FORMAT_VERSION,
            model_id: model_id.to_string(),
            label: frame.label.clone(),
            problem_type,
            eval_metric: metric,
            best_model: best_entry.model.clone(),
            schema,
            classes,
            estimator: best_estimator,
            trained_at: Utc::now(),
        };
        let importance =
            permutation_importance(&predictor, &val_rows, &y_val, TabularConfig::RANDOM_SEED);

        write_json_atomic(&dir.join(ArtifactConfig::PREDICTOR_FILENAME), &predictor)?;
        write_json_atomic(&dir.join(ArtifactConfig::LEADERBOARD_FILENAME), &leaderboard)?;
        write_json_atomic(&dir.join(ArtifactConfig::FEATURE_IMPORTANCE_FILENAME), &importance)?;
        write_json_atomic(
            &dir.join(ArtifactConfig::MANIFEST_FILENAME),
            &Manifest::for_dir(model_id, dir)?,
        )?;

        self.cache.insert(model_id, Arc::new(predictor));

        info!(
            "Training completed for model {} in {:.2}s: best {} ({:.4})",
            model_id,
            started.elapsed().as_secs_f64(),
            best_entry.model,
            best_entry.score_val
        );

        Ok(TrainedModel {
            id: model_id.to_string(),
            artifact_path: dir.to_path_buf(),
            best_model_name: best_entry.model,
            best_score: best_entry.score_val,
            leaderboard: leaderboard
                .into_iter()
                .take(ArtifactConfig::TRAIN_LEADERBOARD_ROWS)
                .collect(),
        })
    }
}

/// Best-first candidates, without any whose score is not finite.
///
/// JSON has no encoding for infinities, so such an entry could not be read
/// back from `leaderboard.json`.
fn rank_candidates<E>(fitted: Vec<(LeaderboardEntry, E)>) -> Vec<(LeaderboardEntry, E)> {
    let mut ranked: Vec<_> = fitted
        .into_iter()
        .filter(|(entry, _)| {
            let finite = entry.score_val.is_finite();
            if !finite {
                warn!("Dropping {}: score_val {} is not finite", entry.model, entry.score_val);
            }
            finite
        })
        .collect();
    // Stable sort keeps fitting order among equal scores.
    ranked.sort_by(|a, b| b.0.score_val.total_cmp(&a.0.score_val));
    ranked
}

impl TrainingBackend for LocalTabularBackend {
    fn train(&self, dataset: &DatasetInfo, config: &TrainingConfig) -> TrainOutcome {
        let model_id = Uuid::new_v4().to_string();
        let guard = match ArtifactDirGuard::create(self.artifact_dir(&model_id)) {
            Ok(guard) => guard,
            Err(e) => {
                error!("Training failed for model {}: {}", model_id, e);
                return TrainOutcome::failed(format!("Training failed: {}", e));
            }
        };
        info!("Model will be saved to: {}", guard.path().display());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.fit_and_save(&model_id, guard.path(), dataset, config)
        }));

        let message = match result {
            Ok(Ok(trained)) => {
                guard.commit();
                return TrainOutcome::Trained(trained);
            }
            Ok(Err(AutoMlError::BackendFailure { message })) => message,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("panic during fitting: {}", panic_message(payload.as_ref())),
        };

        self.cache.remove(&model_id);
        error!("Training failed for model {}: {}", model_id, message);
        // Dropping the guard removes the partial artifact directory.
        drop(guard);
        TrainOutcome::failed(format!("Training failed: {}", message))
    }

    fn predict(&self, model_id: &str, rows: &[FeatureRow]) -> Result<PredictOutcome> {
        let predictor = self.predictor(model_id)?;
        let outcome = predictor.predict(rows).map_err(|e| AutoMlError::BackendFailure {
            message: format!("Prediction failed: {}", e),
        })?;
        info!("Predictions completed for model {} ({} rows)", model_id, rows.len());
        Ok(outcome)
    }

    fn introspect(&self, artifact_path: &Path) -> Option<ModelIntrospection> {
        let model_id = artifact_path.file_name()?.to_str()?.to_string();

        let predictor = match self.predictor(&model_id) {
            Ok(predictor) => predictor,
            Err(e) => {
                warn!("Failed to get model info for {}: {}", artifact_path.display(), e);
                return None;
            }
        };

        let mut info = ModelIntrospection {
            model_id: Some(model_id),
            problem_type: Some(predictor.problem_type),
            label_column: Some(predictor.label.clone()),
            eval_metric: Some(predictor.eval_metric.as_str().to_string()),
            feature_columns: Some(predictor.feature_columns()),
            best_model: Some(predictor.best_model.clone()),
            ..ModelIntrospection::default()
        };

        match read_json::<Vec<LeaderboardEntry>>(
            &artifact_path.join(ArtifactConfig::LEADERBOARD_FILENAME),
        ) {
            Ok(Some(leaderboard)) => {
                info.best_score = leaderboard.first().map(|entry| entry.score_val);
                info.leaderboard = Some(
                    leaderboard
                        .into_iter()
                        .take(ArtifactConfig::DETAIL_LEADERBOARD_ROWS)
                        .collect(),
                );
            }
            Ok(None) => debug!("No leaderboard in {}", artifact_path.display()),
            Err(e) => warn!("Unreadable leaderboard in {}: {}", artifact_path.display(), e),
        }

        match read_json(&artifact_path.join(ArtifactConfig::FEATURE_IMPORTANCE_FILENAME)) {
            Ok(importance) => info.feature_importance = importance,
            Err(e) => warn!(
                "Unreadable feature importance in {}: {}",
                artifact_path.display(),
                e
            ),
        }

        match dir_size(artifact_path) {
            Ok(size) => info.artifact_size_bytes = Some(size),
            Err(e) => warn!("Failed to size {}: {}", artifact_path.display(), e),
        }

        Some(info)
    }

    fn delete(&self, model_id: &str) -> bool {
        let dir = self.artifact_dir(model_id);
        let removed = if !dir.exists() {
            true
        } else {
            match fs::remove_dir_all(&dir) {
                Ok(()) => {
                    info!("Model {} deleted successfully", model_id);
                    true
                }
                Err(e) => {
                    error!("Failed to delete model {}: {}", model_id, e);
                    false
                }
            }
        };

        // Evict after the files are gone so an overlapping load cannot re-cache them.
        if self.cache.remove(model_id) {
            debug!("Evicted model {} from cache", model_id);
        }
        removed
    }

    fn stored_artifacts(&self) -> Result<Vec<StoredArtifact>> {
        let entries = fs::read_dir(&self.models_dir).map_err(|e| AutoMlError::Io {
            message: format!("Failed to read models directory: {}", e),
            path: Some(self.models_dir.clone()),
            source: Some(e),
        })?;

        let mut artifacts: Vec<StoredArtifact> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let id = entry.file_name().to_str()?.to_string();
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .map(DateTime::<Utc>::from);
                Some(StoredArtifact { id, modified })
            })
            .collect();
        artifacts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(artifacts)
    }
}
