//! Training backends.
//!
//! The orchestrator only sees [`TrainingBackend`]. [`LocalTabularBackend`] is
//! the bundled implementation: it owns the artifact store on disk and an
//! in-process cache of loaded predictors.

mod artifact;
mod cache;
mod local;
pub mod tabular;
mod traits;

pub use artifact::{read_json, sha256_file, write_json_atomic, ArtifactDirGuard, Manifest};
pub use cache::ArtifactCache;
pub use local::LocalTabularBackend;
pub use traits::{
    ModelIntrospection, PredictOutcome, StoredArtifact, TrainOutcome, TrainedModel,
    TrainingBackend,
};

use std::any::Any;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
