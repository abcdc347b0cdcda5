//! Caller-facing operations. Each one resolves and authorizes its scope
//! first, then runs or reads, and returns the serializable payload.

pub mod run_commands;
pub mod stats_commands;

pub use run_commands::{run_project_tests, run_route_tests, run_single_test};
pub use stats_commands::{project_stats, route_stats, test_history, test_status};
