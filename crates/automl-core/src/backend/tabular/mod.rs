//! Small tabular learner used by [`LocalTabularBackend`](super::LocalTabularBackend).
//!
//! - `frame`: dataset cleanup, problem-type inference, feature encoding
//! - `estimators`: candidate models and their fitting
//! - `metrics`: validation scores, higher is better
//! - `predictor`: the saved artifact and batch prediction
//! - `importance`: permutation feature importance

mod estimators;
mod frame;
mod importance;
mod metrics;
mod predictor;

pub use estimators::{CandidateKind, Estimator, Prediction};
pub use frame::{
    holdout_split, resolve_problem_type, ColumnEncoding, FeatureSchema, PreparedFrame, TargetValues,
};
pub use importance::permutation_importance;
pub use metrics::EvalMetric;
pub use predictor::Predictor;

use thiserror::Error;

use crate::error::AutoMlError;

/// Why the tabular learner rejected a dataset or configuration.
#[derive(Debug, Error)]
pub enum TabularError {
    #[error("Target feature '{0}' not found in dataset")]
    MissingTarget(String),

    #[error("Dataset has no rows with a target value")]
    EmptyDataset,

    #[error("Regression requires a numeric target; '{column}' has value {value}")]
    NonNumericTarget { column: String, value: String },

    #[error("Binary classification needs exactly two classes, found {0}")]
    BinaryClassCount(usize),

    #[error("Unknown presets '{0}'")]
    UnknownPresets(String),

    #[error("Unknown eval metric '{metric}' for {problem_type} problems")]
    UnknownMetric {
        metric: String,
        problem_type: String,
    },

    #[error("Row {row} has none of the feature columns: {expected}")]
    UnrecognizedRow { row: usize, expected: String },
}

impl From<TabularError> for AutoMlError {
    fn from(err: TabularError) -> Self {
        AutoMlError::BackendFailure {
            message: err.to_string(),
        }
    }
}
