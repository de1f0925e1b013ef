//! Model lifecycle orchestration.
//!
//! [`ModelService`] drives a record through
//! `training -> completed | failed`, keeping the record store, the artifact
//! store and the backend cache in agreement.

mod service;
mod validation;

pub use service::{ModelService, RecoveryReport};
pub use validation::ServiceLimits;
