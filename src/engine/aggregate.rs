//! Current status and pass-rate roll-ups.
//!
//! Everything here is a pure read over persisted results: "latest" is the
//! result with the greatest `created_at`, ties going to the greater id.
//! Tests that never ran count toward the total but never as passed.

use crate::domain::{
    AggregatedStats, CurrentStatus, ProjectId, RouteId, TestId, TestResult,
};
use crate::error::EngineResult;
use crate::store::{Catalog, ResultStore};

pub fn latest_result(history: &[TestResult]) -> Option<&TestResult> {
    history
        .iter()
        .max_by(|left, right| (left.created_at, left.id).cmp(&(right.created_at, right.id)))
}

pub fn current_status(history: &[TestResult]) -> CurrentStatus {
    CurrentStatus::from_latest(latest_result(history).cloned())
}

/// `passed / total * 100` rounded to two decimals; `0` for an empty scope.
pub fn pass_percentage(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to_2(passed as f64 / total as f64 * 100.0)
}

fn round_to_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn roll_up<'a>(statuses: impl IntoIterator<Item = &'a CurrentStatus>) -> AggregatedStats {
    let mut total_tests = 0;
    let mut passed_tests = 0;
    let mut failed_tests = 0;
    let mut never_run_tests = 0;

    for status in statuses {
        total_tests += 1;
        match status {
            CurrentStatus::Passed(_) => passed_tests += 1,
            CurrentStatus::Failed(_) => failed_tests += 1,
            CurrentStatus::NeverRun => never_run_tests += 1,
        }
    }

    AggregatedStats {
        total_tests,
        passed_tests,
        failed_tests,
        never_run_tests,
        percentage: pass_percentage(passed_tests, total_tests),
    }
}

pub fn status_of(store: &dyn ResultStore, test_id: TestId) -> EngineResult<CurrentStatus> {
    Ok(current_status(&store.history(test_id)?))
}

pub fn stats_of_route(
    catalog: &dyn Catalog,
    store: &dyn ResultStore,
    route_id: RouteId,
) -> EngineResult<AggregatedStats> {
    let tests = catalog.tests_in_route(route_id)?;
    let statuses = tests
        .iter()
        .map(|test| status_of(store, test.id))
        .collect::<EngineResult<Vec<_>>>()?;
    Ok(roll_up(&statuses))
}

pub fn stats_of_project(
    catalog: &dyn Catalog,
    store: &dyn ResultStore,
    project_id: ProjectId,
) -> EngineResult<AggregatedStats> {
    let statuses = catalog
        .tests_in_project(project_id)?
        .iter()
        .map(|test| status_of(store, test.id))
        .collect::<EngineResult<Vec<_>>>()?;
    Ok(roll_up(&statuses))
}
