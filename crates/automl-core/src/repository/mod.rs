//! Model record persistence.
//!
//! One row per training attempt in a `trained_models` SQLite table, keyed by
//! the model identifier.

mod sqlite;
mod traits;

pub use sqlite::SqliteModelRepository;
pub use traits::{ModelRepository, Reconciliation, StatusUpdate};
