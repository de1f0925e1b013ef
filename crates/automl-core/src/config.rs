//! Centralized configuration for the AutoML core.
//!
//! Constant groups hold limits and file names; [`AutoMlConfig`] is the
//! runtime snapshot built once at process start.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AutoMlError, Result};

/// Limits enforced by the orchestrator.
pub struct TrainingLimits;

impl TrainingLimits {
    pub const MAX_TRAINING_TIME_SECS: u64 = 7200; // 2 hours
    pub const PRODUCTION_MAX_TRAINING_TIME_SECS: u64 = 3600;
    pub const MAX_PREDICTION_BATCH_SIZE: usize = 10_000;
    pub const MAX_MODEL_NAME_LEN: usize = 255;
    /// Slack past a run's time limit before recovery treats it as abandoned.
    pub const RECOVERY_GRACE_SECS: u64 = 300;
}

/// Defaults applied to training requests that omit a field.
pub struct DefaultsConfig;

impl DefaultsConfig {
    pub const TIME_LIMIT_SECS: u64 = 600;
    pub const PRESETS: &'static str = "best_quality";
    pub const VERBOSITY: u8 = 2;
}

/// Directory and file names under the data root.
pub struct PathsConfig;

impl PathsConfig {
    pub const DATA_DIR_NAME: &'static str = "automl";
    pub const MODELS_DIR_NAME: &'static str = "models_output";
    pub const DATABASE_FILENAME: &'static str = "automl.db";
    pub const LOGS_DIR_NAME: &'static str = "logs";
}

/// Layout of a trained artifact directory.
pub struct ArtifactConfig;

impl ArtifactConfig {
    pub const FORMAT_VERSION: u32 = 1;
    pub const PREDICTOR_FILENAME: &'static str = "predictor.json";
    pub const LEADERBOARD_FILENAME: &'static str = "leaderboard.json";
    pub const FEATURE_IMPORTANCE_FILENAME: &'static str = "feature_importance.json";
    pub const MANIFEST_FILENAME: &'static str = "manifest.json";
    /// Leaderboard rows returned from a training call.
    pub const TRAIN_LEADERBOARD_ROWS: usize = 5;
    /// Leaderboard rows returned from introspection.
    pub const DETAIL_LEADERBOARD_ROWS: usize = 10;
}

/// Tuning for the bundled tabular backend.
pub struct TabularConfig;

impl TabularConfig {
    /// Share of rows held out for validation scoring.
    pub const HOLDOUT_FRACTION: f64 = 0.2;
    /// Below this many rows, candidates are scored on their training rows.
    pub const MIN_ROWS_FOR_HOLDOUT: usize = 5;
    pub const RANDOM_SEED: u64 = 0;
    /// Most frequent categories kept per one-hot column.
    pub const MAX_CATEGORIES: usize = 50;
    /// Integer targets with at most this many distinct values are multiclass.
    pub const MAX_INFERRED_CLASSES: usize = 10;
    pub const KNN_NEIGHBORS: usize = 5;
    pub const RIDGE_ALPHA: f64 = 1.0;
    /// Rows sampled when computing permutation importance.
    pub const IMPORTANCE_SUBSAMPLE: usize = 1000;
}

/// Deployment profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Testing,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Development => "development",
            Profile::Production => "production",
            Profile::Testing => "testing",
        }
    }

    fn max_training_time_secs(&self) -> u64 {
        match self {
            Profile::Production => TrainingLimits::PRODUCTION_MAX_TRAINING_TIME_SECS,
            Profile::Development | Profile::Testing => TrainingLimits::MAX_TRAINING_TIME_SECS,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = AutoMlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "default" => Ok(Profile::Development),
            "production" | "prod" => Ok(Profile::Production),
            "testing" | "test" => Ok(Profile::Testing),
            other => Err(AutoMlError::Config {
                message: format!("Unknown profile: {}", other),
            }),
        }
    }
}

/// Where model records are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    InMemory,
}

/// Runtime configuration snapshot.
#[derive(Debug, Clone)]
pub struct AutoMlConfig {
    pub profile: Profile,
    pub data_root: PathBuf,
    pub models_dir: PathBuf,
    pub database: DatabaseLocation,
    /// Hard ceiling on a request's `time_limit`.
    pub max_training_time_secs: u64,
    pub max_prediction_batch_size: usize,
}

impl AutoMlConfig {
    /// Profile defaults rooted at `data_root`.
    pub fn for_profile(profile: Profile, data_root: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        let database = match profile {
            Profile::Testing => DatabaseLocation::InMemory,
            Profile::Development | Profile::Production => {
                DatabaseLocation::File(data_root.join(PathsConfig::DATABASE_FILENAME))
            }
        };

        Self {
            profile,
            models_dir: data_root.join(PathsConfig::MODELS_DIR_NAME),
            database,
            max_training_time_secs: profile.max_training_time_secs(),
            max_prediction_batch_size: TrainingLimits::MAX_PREDICTION_BATCH_SIZE,
            data_root,
        }
    }

    /// Load configuration from the process environment.
    ///
    /// Recognized variables: `AUTOML_PROFILE`, `AUTOML_DATA_ROOT`,
    /// `MODELS_PATH`, `DATABASE_PATH`, `MAX_TRAINING_TIME`,
    /// `MAX_PREDICTION_BATCH_SIZE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let profile = match lookup("AUTOML_PROFILE") {
            Some(value) => value.parse()?,
            None => Profile::default(),
        };

        let data_root = lookup("AUTOML_DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_root);

        let mut config = Self::for_profile(profile, data_root);

        if let Some(models) = lookup("MODELS_PATH") {
            config.models_dir = resolve_against(&config.data_root, &models);
        }
        if let Some(db) = lookup("DATABASE_PATH") {
            config.database = if db == ":memory:" {
                DatabaseLocation::InMemory
            } else {
                DatabaseLocation::File(resolve_against(&config.data_root, &db))
            };
        }
        if let Some(value) = lookup("MAX_TRAINING_TIME") {
            config.max_training_time_secs = parse_positive("MAX_TRAINING_TIME", &value)?;
        }
        if let Some(value) = lookup("MAX_PREDICTION_BATCH_SIZE") {
            config.max_prediction_batch_size =
                parse_positive("MAX_PREDICTION_BATCH_SIZE", &value)? as usize;
        }

        Ok(config)
    }

    /// Directory for log files, if a front-end wants to write them.
    pub fn logs_dir(&self) -> PathBuf {
        self.data_root.join(PathsConfig::LOGS_DIR_NAME)
    }
}

/// Platform data directory, falling back to the working directory.
pub fn default_data_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(PathsConfig::DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(format!("./{}-data", PathsConfig::DATA_DIR_NAME)))
}

fn resolve_against(root: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AutoMlError::Config {
            message: format!("{} must be a positive integer, got '{}'", key, value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_profile_defaults() {
        let dev = AutoMlConfig::for_profile(Profile::Development, "/srv/automl");
        assert_eq!(dev.max_training_time_secs, 7200);
        assert_eq!(
            dev.database,
            DatabaseLocation::File(PathBuf::from("/srv/automl/automl.db"))
        );
        assert_eq!(dev.models_dir, PathBuf::from("/srv/automl/models_output"));

        let prod = AutoMlConfig::for_profile(Profile::Production, "/srv/automl");
        assert_eq!(prod.max_training_time_secs, 3600);

        let test = AutoMlConfig::for_profile(Profile::Testing, "/tmp/x");
        assert_eq!(test.database, DatabaseLocation::InMemory);
    }

    #[test]
    fn test_env_overrides() {
        let config = AutoMlConfig::from_lookup(lookup_from(&[
            ("AUTOML_PROFILE", "production"),
            ("AUTOML_DATA_ROOT", "/data"),
            ("MODELS_PATH", "artifacts"),
            ("DATABASE_PATH", "/var/lib/automl/records.db"),
            ("MAX_TRAINING_TIME", "120"),
            ("MAX_PREDICTION_BATCH_SIZE", "50"),
        ]))
        .unwrap();

        assert_eq!(config.profile, Profile::Production);
        assert_eq!(config.models_dir, PathBuf::from("/data/artifacts"));
        assert_eq!(
            config.database,
            DatabaseLocation::File(PathBuf::from("/var/lib/automl/records.db"))
        );
        assert_eq!(config.max_training_time_secs, 120);
        assert_eq!(config.max_prediction_batch_size, 50);
    }

    #[test]
    fn test_invalid_env_values() {
        assert!(AutoMlConfig::from_lookup(lookup_from(&[("MAX_TRAINING_TIME", "0")])).is_err());
        assert!(AutoMlConfig::from_lookup(lookup_from(&[("AUTOML_PROFILE", "staging")])).is_err());
    }

    #[test]
    fn test_memory_database_override() {
        let config = AutoMlConfig::from_lookup(lookup_from(&[
            ("AUTOML_DATA_ROOT", "/data"),
            ("DATABASE_PATH", ":memory:"),
        ]))
        .unwrap();
        assert_eq!(config.database, DatabaseLocation::InMemory);
    }
}
