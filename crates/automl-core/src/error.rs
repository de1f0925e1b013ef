//! Error types for the AutoML core.
//!
//! Every failure an orchestration call can produce is one of these variants.
//! [`ErrorKind`] folds them into the five categories callers branch on.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::ModelStatus;

/// Main error type for the AutoML core.
#[derive(Debug, Error)]
pub enum AutoMlError {
    // Caller errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Model not found: {model_id}")]
    ModelNotFound { model_id: String },

    #[error("Model {model_id} is not ready for predictions. Status: {status}")]
    NotReady { model_id: String, status: ModelStatus },

    // Backend errors
    #[error("Training backend failure: {message}")]
    BackendFailure { message: String },

    // Database errors
    #[error("Persistence error: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for AutoML operations.
pub type Result<T> = std::result::Result<T, AutoMlError>;

/// Coarse classification of an [`AutoMlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; nothing was persisted.
    Validation,
    /// Unknown identifier.
    NotFound,
    /// Valid identifier in the wrong state for the operation.
    NotReady,
    /// The training backend reported a failure.
    BackendFailure,
    /// The record store failed; prior state is unchanged.
    Persistence,
    /// Anything else (filesystem, configuration, serialization).
    Internal,
}

impl From<std::io::Error> for AutoMlError {
    fn from(err: std::io::Error) -> Self {
        AutoMlError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for AutoMlError {
    fn from(err: serde_json::Error) -> Self {
        AutoMlError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for AutoMlError {
    fn from(err: rusqlite::Error) -> Self {
        AutoMlError::Persistence {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl AutoMlError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        AutoMlError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a validation error for a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AutoMlError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a persistence error without an underlying SQLite error.
    pub fn persistence(message: impl Into<String>) -> Self {
        AutoMlError::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AutoMlError::Validation { .. } => ErrorKind::Validation,
            AutoMlError::ModelNotFound { .. } => ErrorKind::NotFound,
            AutoMlError::NotReady { .. } => ErrorKind::NotReady,
            AutoMlError::BackendFailure { .. } => ErrorKind::BackendFailure,
            AutoMlError::Persistence { .. } => ErrorKind::Persistence,
            AutoMlError::Io { .. }
            | AutoMlError::Json { .. }
            | AutoMlError::Config { .. }
            | AutoMlError::Other(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status a boundary layer should answer with.
    ///
    /// - 400: validation errors, models not ready, failed predictions
    /// - 404: unknown identifiers
    /// - 500: persistence and internal errors
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::NotReady | ErrorKind::BackendFailure => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Persistence | ErrorKind::Internal => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AutoMlError::ModelNotFound {
            model_id: "m1".into(),
        };
        assert_eq!(err.to_string(), "Model not found: m1");

        let err = AutoMlError::NotReady {
            model_id: "m2".into(),
            status: ModelStatus::Training,
        };
        assert_eq!(
            err.to_string(),
            "Model m2 is not ready for predictions. Status: training"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AutoMlError::validation("target_feature", "missing").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            AutoMlError::persistence("locked").kind(),
            ErrorKind::Persistence
        );
        assert_eq!(
            AutoMlError::Config {
                message: "bad".into()
            }
            .kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(
            AutoMlError::ModelNotFound {
                model_id: "x".into()
            }
            .http_status(),
            404
        );
        assert_eq!(
            AutoMlError::BackendFailure {
                message: "boom".into()
            }
            .http_status(),
            400
        );
        assert_eq!(AutoMlError::persistence("disk full").http_status(), 500);
    }
}
