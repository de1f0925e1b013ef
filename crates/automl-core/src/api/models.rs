//! Model lifecycle methods on AutoMlApi.

use crate::error::Result;
use crate::models::{
    DatasetInfo, FeatureRow, ModelDetails, ModelRecord, ModelStatus, PredictResponse,
    TrainResponse, TrainingConfig,
};
use crate::orchestrator::RecoveryReport;
use crate::AutoMlApi;

impl AutoMlApi {
    // ========================================
    // Training
    // ========================================

    /// Train a model. Blocks a worker thread for the length of the run.
    pub async fn train(&self, dataset: DatasetInfo, config: TrainingConfig) -> Result<TrainResponse> {
        self.blocking("Training", move |service| service.train(&dataset, &config))
            .await
    }

    // ========================================
    // Prediction
    // ========================================

    /// Predict with a completed model.
    pub async fn predict(
        &self,
        model_id: impl Into<String>,
        rows: Vec<FeatureRow>,
    ) -> Result<PredictResponse> {
        let model_id = model_id.into();
        self.blocking("Prediction", move |service| service.predict(&model_id, &rows))
            .await
    }

    // ========================================
    // Records
    // ========================================

    /// Current status, `None` for an unknown identifier.
    pub async fn get_status(&self, model_id: impl Into<String>) -> Result<Option<ModelStatus>> {
        let model_id = model_id.into();
        self.blocking("Status lookup", move |service| service.get_status(&model_id))
            .await
    }

    /// All models, newest first.
    pub async fn list_models(&self) -> Result<Vec<ModelRecord>> {
        self.blocking("Model listing", |service| service.list_models())
            .await
    }

    /// A model with artifact details, `None` for an unknown identifier.
    pub async fn get_model(&self, model_id: impl Into<String>) -> Result<Option<ModelDetails>> {
        let model_id = model_id.into();
        self.blocking("Model lookup", move |service| service.get_model(&model_id))
            .await
    }

    /// Delete a model's record and artifact. `false` if it did not exist.
    pub async fn delete_model(&self, model_id: impl Into<String>) -> Result<bool> {
        let model_id = model_id.into();
        self.blocking("Model deletion", move |service| service.delete(&model_id))
            .await
    }

    /// Fail abandoned trainings and remove orphaned artifacts.
    ///
    /// Runs still within their time budget are left alone.
    pub async fn recover(&self) -> Result<RecoveryReport> {
        self.blocking("Recovery", |service| service.recover()).await
    }
}
