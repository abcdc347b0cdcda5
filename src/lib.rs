//! Test execution and result aggregation for API projects.
//!
//! Stored test definitions are sent to their project's endpoints
//! concurrently, judged against the expected status (and optionally body),
//! and every outcome is appended to an immutable history. Pass rates are
//! always derived from each test's latest result.

pub mod commands;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod store;

#[cfg(test)]
mod test_support;

pub use config::{ConfigError, EngineConfig};
pub use engine::compare::CompareMode;
pub use engine::runner::Orchestrator;
pub use error::{DataError, EngineError, EngineResult, NetworkError, NetworkErrorKind};
pub use store::sqlite::SqliteStore;
pub use store::{Catalog, ResultStore};
