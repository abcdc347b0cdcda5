use super::types::{
    ExecutionOutcome, OutcomeKind, ProjectId, RouteId, TestId, TestResult,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

// ─── Execution summaries ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunEntry {
    pub test_id: TestId,
    pub name: String,
    pub passed: bool,
    pub outcome: OutcomeKind,
    pub expected_status: Option<u16>,
    pub actual_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl From<&ExecutionOutcome> for TestRunEntry {
    fn from(outcome: &ExecutionOutcome) -> Self {
        Self {
            test_id: outcome.test_id,
            name: outcome.name.clone(),
            passed: outcome.verdict.passed(),
            outcome: outcome.verdict.kind(),
            expected_status: outcome.expected_status,
            actual_status: outcome.actual_status,
            expected_body: outcome.expected_body.clone(),
            error: outcome.verdict.error_message(),
            duration_ms: outcome.duration_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRunReport {
    pub route_id: RouteId,
    pub total_tests: usize,
    pub passed: usize,
    pub percentage: f64,
    pub results: Vec<TestRunEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRunReport {
    pub project_id: ProjectId,
    pub total_tests: usize,
    pub passed: usize,
    pub percentage: f64,
    pub results: Vec<TestRunEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleRunReport {
    pub test_id: TestId,
    pub name: String,
    pub passed: bool,
    pub outcome: OutcomeKind,
    pub expected_status: Option<u16>,
    pub actual_status: Option<u16>,
    pub actual_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_body: Option<Value>,
    pub duration_ms: u64,
    /// Timestamp of the result row this run appended.
    pub created_at: DateTime<Utc>,
    pub percentage_after_run: f64,
}

// ─── Read-side payloads ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TestStatusReport {
    #[serde(rename_all = "camelCase")]
    NeverRun { test_id: TestId, has_run: bool },
    #[serde(rename_all = "camelCase")]
    Ran {
        test_id: TestId,
        has_run: bool,
        passed: bool,
        actual_status: Option<u16>,
        actual_body: Option<String>,
        created_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestHistoryReport {
    pub test_id: TestId,
    pub results: Vec<TestResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatsReport {
    pub project_id: ProjectId,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub never_run_tests: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatsEntry {
    pub route_id: RouteId,
    pub route_name: String,
    pub method: String,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub never_run_tests: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatsReport {
    pub project_id: ProjectId,
    pub routes: Vec<RouteStatsEntry>,
}
