//! Data models for the AutoML core.
//!
//! Wire names match the REST payloads clients already consume (`uuid`,
//! `model_path`, `best_model_name`, ...).

mod domain;
mod record;
mod responses;

pub use domain::*;
pub use record::*;
pub use responses::*;
