use crate::domain::{
    ProjectId, ProjectRunReport, RouteId, RouteRunReport, SingleRunReport, TestId, TestRunEntry,
    UserId,
};
use crate::engine::aggregate::{pass_percentage, stats_of_route};
use crate::engine::runner::Orchestrator;
use crate::engine::scope::{resolve_project, resolve_route, resolve_test};
use crate::error::{EngineError, EngineResult};
use crate::store::{Catalog, ResultStore};

pub async fn run_route_tests<S: Catalog + ResultStore>(
    store: &S,
    orchestrator: &Orchestrator,
    caller: UserId,
    project_id: ProjectId,
    route_id: RouteId,
) -> EngineResult<RouteRunReport> {
    let scope = resolve_route(store, caller, project_id, route_id)?;
    tracing::info!(
        project_id,
        route_id,
        route = %scope.route.name,
        tests = scope.tests.len(),
        "running route tests"
    );

    let run = orchestrator.run_batch(store, scope.tests).await?;
    let total_tests = run.outcomes.len();
    let passed = run.passed_count();

    Ok(RouteRunReport {
        route_id: scope.route.id,
        total_tests,
        passed,
        percentage: pass_percentage(passed, total_tests),
        results: run.outcomes.iter().map(TestRunEntry::from).collect(),
    })
}

pub async fn run_project_tests<S: Catalog + ResultStore>(
    store: &S,
    orchestrator: &Orchestrator,
    caller: UserId,
    project_id: ProjectId,
) -> EngineResult<ProjectRunReport> {
    let scope = resolve_project(store, caller, project_id)?;
    tracing::info!(project_id, tests = scope.tests.len(), "running project tests");

    let run = orchestrator.run_batch(store, scope.tests).await?;
    let total_tests = run.outcomes.len();
    let passed = run.passed_count();

    Ok(ProjectRunReport {
        project_id: scope.project.id,
        total_tests,
        passed,
        percentage: pass_percentage(passed, total_tests),
        results: run.outcomes.iter().map(TestRunEntry::from).collect(),
    })
}

pub async fn run_single_test<S: Catalog + ResultStore>(
    store: &S,
    orchestrator: &Orchestrator,
    caller: UserId,
    test_id: TestId,
) -> EngineResult<SingleRunReport> {
    let scope = resolve_test(store, caller, test_id)?;
    let route_id = scope.route.id;
    tracing::info!(test_id, route_id, "running single test");

    let run = orchestrator.run_batch(store, vec![scope.test]).await?;
    let created_at = run
        .records
        .first()
        .map(|record| record.created_at)
        .ok_or_else(|| EngineError::not_found("test", test_id))?;
    let outcome = run
        .outcomes
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::not_found("test", test_id))?;
    let percentage_after_run = stats_of_route(store, store, route_id)?.percentage;

    Ok(SingleRunReport {
        test_id: outcome.test_id,
        passed: outcome.verdict.passed(),
        outcome: outcome.verdict.kind(),
        expected_status: outcome.expected_status,
        actual_status: outcome.actual_status,
        actual_body: outcome.actual_body,
        expected_body: outcome.expected_body,
        name: outcome.name,
        duration_ms: outcome.duration_ms,
        created_at,
        percentage_after_run,
    })
}
