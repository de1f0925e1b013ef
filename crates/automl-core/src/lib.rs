//! AutoML Core - Headless library for training, tracking and serving tabular models.
//!
//! A training request creates a tracked record, hands the dataset to a
//! [`TrainingBackend`], and reconciles the record with the identifier the
//! backend chose for its artifact. Predictions are served only from
//! completed models.
//!
//! # Example
//!
//! ```rust,ignore
//! use automl_core::{AutoMlApi, DatasetInfo, TrainingConfig};
//!
//! #[tokio::main]
//! async fn main() -> automl_core::Result<()> {
//!     let api = AutoMlApi::new("/path/to/automl-data").await?;
//!
//!     let dataset = DatasetInfo::new("houses.csv", headers, rows);
//!     let config = TrainingConfig::new("house prices", "price").with_time_limit(120);
//!     let response = api.train(dataset, config).await?;
//!     println!("Trained {:?} ({:?})", response.model_uuid, response.best_score);
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod repository;

mod api;

// Re-export commonly used types
pub use backend::{
    LocalTabularBackend, ModelIntrospection, PredictOutcome, TrainOutcome, TrainedModel,
    TrainingBackend,
};
pub use config::{AutoMlConfig, DatabaseLocation, Profile};
pub use error::{AutoMlError, ErrorKind, Result};
pub use models::{
    DatasetInfo, ErrorResponse, FeatureRow, LeaderboardEntry, ModelDetails, ModelRecord,
    ModelStatus, PredictResponse, ProblemType, TrainResponse, TrainingConfig,
};
pub use orchestrator::{ModelService, RecoveryReport, ServiceLimits};
pub use repository::{ModelRepository, SqliteModelRepository};

pub use api::AutoMlApiBuilder;

use std::path::Path;
use std::sync::Arc;

/// Main API struct for AutoML operations.
///
/// Cheap to share behind an `Arc`. Each call runs the orchestrator on a
/// blocking worker, so concurrent trainings proceed in parallel.
pub struct AutoMlApi {
    config: AutoMlConfig,
    service: Arc<ModelService>,
}

impl AutoMlApi {
    /// Create a builder rooted at `data_root`.
    pub fn builder(data_root: impl Into<std::path::PathBuf>) -> AutoMlApiBuilder {
        AutoMlApiBuilder::new(data_root)
    }

    /// Open (or create) the default SQLite store and local backend under `data_root`.
    pub async fn new(data_root: impl Into<std::path::PathBuf>) -> Result<Self> {
        Self::builder(data_root).build().await
    }

    /// Build from `AUTOML_*` and related environment variables.
    pub async fn from_env() -> Result<Self> {
        AutoMlApiBuilder::from_config(AutoMlConfig::from_env()?)
            .build()
            .await
    }

    pub fn config(&self) -> &AutoMlConfig {
        &self.config
    }

    pub fn data_root(&self) -> &Path {
        &self.config.data_root
    }

    /// The synchronous orchestrator behind this facade.
    pub fn service(&self) -> &Arc<ModelService> {
        &self.service
    }

    /// Run `f` against the orchestrator on a blocking worker.
    async fn blocking<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&ModelService) -> Result<T> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || f(&service))
            .await
            .map_err(|e| AutoMlError::Other(format!("{} task failed: {}", operation, e)))?
    }
}
