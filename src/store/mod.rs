//! Data-layer seams the engine reads membership from and appends results to.

pub mod sqlite;

use crate::domain::{
    NewTestResult, Project, ProjectId, Route, RouteId, Test, TestId, TestResult, UserId,
};
use crate::error::EngineResult;

/// Read-only view of users, projects, routes and tests.
///
/// List operations return rows in ascending id order.
pub trait Catalog: Send + Sync {
    fn user_exists(&self, user_id: UserId) -> EngineResult<bool>;
    fn project(&self, project_id: ProjectId) -> EngineResult<Option<Project>>;
    fn route(&self, route_id: RouteId) -> EngineResult<Option<Route>>;
    fn test(&self, test_id: TestId) -> EngineResult<Option<Test>>;
    fn routes_in_project(&self, project_id: ProjectId) -> EngineResult<Vec<Route>>;
    fn tests_in_route(&self, route_id: RouteId) -> EngineResult<Vec<Test>>;

    /// Tests under every route of the project. A test belongs to the
    /// project its route belongs to; this is the only membership rule that
    /// runs and stats use.
    fn tests_in_project(&self, project_id: ProjectId) -> EngineResult<Vec<Test>> {
        let mut tests = Vec::new();
        for route in self.routes_in_project(project_id)? {
            tests.extend(self.tests_in_route(route.id)?);
        }
        tests.sort_by_key(|test| test.id);
        Ok(tests)
    }
}

/// Append-only result history.
pub trait ResultStore: Send + Sync {
    /// Insert the whole batch atomically; nothing is stored if any row fails.
    fn append_results(&self, batch: &[NewTestResult]) -> EngineResult<Vec<TestResult>>;

    /// All results for a test, oldest first (`created_at`, then `id`).
    fn history(&self, test_id: TestId) -> EngineResult<Vec<TestResult>>;
}
