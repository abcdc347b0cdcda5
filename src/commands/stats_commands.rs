use crate::domain::{
    ProjectId, ProjectStatsReport, RouteStatsEntry, RouteStatsReport, TestHistoryReport,
    TestId, TestStatusReport, UserId,
};
use crate::engine::aggregate::{current_status, stats_of_project, stats_of_route};
use crate::engine::scope::{owned_project, owned_test};
use crate::error::EngineResult;
use crate::store::{Catalog, ResultStore};

pub fn test_status<S: Catalog + ResultStore>(
    store: &S,
    caller: UserId,
    test_id: TestId,
) -> EngineResult<TestStatusReport> {
    let test = owned_test(store, caller, test_id)?;
    let status = current_status(&store.history(test.id)?);
    let report = match status.latest() {
        None => TestStatusReport::NeverRun {
            test_id: test.id,
            has_run: status.has_run(),
        },
        Some(latest) => TestStatusReport::Ran {
            test_id: test.id,
            has_run: status.has_run(),
            passed: status.is_passed(),
            actual_status: latest.actual_status,
            actual_body: latest.actual_body.clone(),
            created_at: latest.created_at,
        },
    };
    Ok(report)
}

/// Every stored result for the test, oldest first.
pub fn test_history<S: Catalog + ResultStore>(
    store: &S,
    caller: UserId,
    test_id: TestId,
) -> EngineResult<TestHistoryReport> {
    let test = owned_test(store, caller, test_id)?;
    Ok(TestHistoryReport {
        test_id: test.id,
        results: store.history(test.id)?,
    })
}

pub fn project_stats<S: Catalog + ResultStore>(
    store: &S,
    caller: UserId,
    project_id: ProjectId,
) -> EngineResult<ProjectStatsReport> {
    let project = owned_project(store, caller, project_id)?;
    let stats = stats_of_project(store, store, project.id)?;
    Ok(ProjectStatsReport {
        project_id: project.id,
        total_tests: stats.total_tests,
        passed_tests: stats.passed_tests,
        failed_tests: stats.failed_tests,
        never_run_tests: stats.never_run_tests,
        percentage: stats.percentage,
    })
}

pub fn route_stats<S: Catalog + ResultStore>(
    store: &S,
    caller: UserId,
    project_id: ProjectId,
) -> EngineResult<RouteStatsReport> {
    let project = owned_project(store, caller, project_id)?;
    let mut routes = Vec::new();
    for route in store.routes_in_project(project.id)? {
        let stats = stats_of_route(store, store, route.id)?;
        routes.push(RouteStatsEntry {
            route_id: route.id,
            route_name: route.name,
            method: route.method,
            total_tests: stats.total_tests,
            passed_tests: stats.passed_tests,
            failed_tests: stats.failed_tests,
            never_run_tests: stats.never_run_tests,
            percentage: stats.percentage,
        });
    }
    Ok(RouteStatsReport {
        project_id: project.id,
        routes,
    })
}
