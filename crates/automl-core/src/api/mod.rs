//! API implementation submodules.
//!
//! Each submodule contains `impl AutoMlApi` blocks; the struct itself lives
//! in `lib.rs`.

mod builder;
mod models;

pub use builder::AutoMlApiBuilder;
