//! Builder for configuring AutoMlApi initialization.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::backend::{LocalTabularBackend, TrainingBackend};
use crate::config::{AutoMlConfig, DatabaseLocation, Profile};
use crate::error::{AutoMlError, Result};
use crate::orchestrator::{ModelService, ServiceLimits};
use crate::repository::{ModelRepository, SqliteModelRepository};
use crate::AutoMlApi;

/// Builder for configuring AutoMlApi initialization.
///
/// # Example
///
/// ```rust,ignore
/// use automl_core::AutoMlApi;
///
/// let api = AutoMlApi::builder("./automl-data")
///     .recover_on_start(true)
///     .build()
///     .await?;
/// ```
pub struct AutoMlApiBuilder {
    config: AutoMlConfig,
    backend: Option<Arc<dyn TrainingBackend>>,
    repository: Option<Arc<dyn ModelRepository>>,
    auto_create_dirs: bool,
    recover_on_start: bool,
}

impl AutoMlApiBuilder {
    /// Create a builder with development defaults rooted at `data_root`.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self::from_config(AutoMlConfig::for_profile(Profile::Development, data_root))
    }

    /// Create a builder from an explicit configuration.
    pub fn from_config(config: AutoMlConfig) -> Self {
        Self {
            config,
            backend: None,
            repository: None,
            auto_create_dirs: true,
            recover_on_start: false,
        }
    }

    /// Use a custom training backend instead of the bundled tabular one.
    pub fn with_backend(mut self, backend: Arc<dyn TrainingBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use a custom record store instead of SQLite.
    pub fn with_repository(mut self, repository: Arc<dyn ModelRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Auto-create the data root and models directory.
    ///
    /// Default: `true`
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Run [`AutoMlApi::recover`] during `build`.
    ///
    /// Meant for the process that owns the data root, such as a long-running
    /// server. Short-lived readers should leave it off.
    ///
    /// Default: `false`
    pub fn recover_on_start(mut self, enable: bool) -> Self {
        self.recover_on_start = enable;
        self
    }

    fn create_dir(dir: &Path) -> Result<()> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| AutoMlError::Io {
                message: format!("Failed to create directory: {}", dir.display()),
                path: Some(dir.to_path_buf()),
                source: Some(e),
            })?;
        }
        Ok(())
    }

    /// Build the AutoMlApi instance.
    pub async fn build(self) -> Result<AutoMlApi> {
        let config = self.config;

        if self.auto_create_dirs {
            Self::create_dir(&config.data_root)?;
            Self::create_dir(&config.models_dir)?;
        } else if !config.data_root.exists() {
            return Err(AutoMlError::Config {
                message: format!("Data root does not exist: {}", config.data_root.display()),
            });
        }

        let repository = match self.repository {
            Some(repository) => repository,
            None => {
                let location = config.database.clone();
                let repository = tokio::task::spawn_blocking(move || {
                    SqliteModelRepository::open(&location)
                })
                .await
                .map_err(|e| AutoMlError::Other(format!("Database open task failed: {}", e)))??;
                Arc::new(repository) as Arc<dyn ModelRepository>
            }
        };

        let backend = match self.backend {
            Some(backend) => backend,
            None => Arc::new(LocalTabularBackend::new(&config.models_dir)?) as Arc<dyn TrainingBackend>,
        };

        let service = Arc::new(
            ModelService::new(backend, repository).with_limits(ServiceLimits::from(&config)),
        );

        match &config.database {
            DatabaseLocation::File(path) => info!(
                "AutoML API ready: profile={}, database={}, models={}",
                config.profile,
                path.display(),
                config.models_dir.display()
            ),
            DatabaseLocation::InMemory => info!(
                "AutoML API ready: profile={}, database=:memory:, models={}",
                config.profile,
                config.models_dir.display()
            ),
        }

        let api = AutoMlApi { config, service };

        if self.recover_on_start {
            api.recover().await?;
        }

        Ok(api)
    }
}
