use crate::error::{DataError, NetworkError};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type UserId = i64;
pub type ProjectId = i64;
pub type RouteId = i64;
pub type TestId = i64;
pub type ResultId = i64;

pub const UNNAMED_TEST: &str = "Unnamed test";

// ─── Membership (owned by the data layer) ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub business_logic: String,
    pub base_url: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: RouteId,
    /// Path segment joined onto the project's base URL.
    pub name: String,
    pub method: String,
    pub project_id: ProjectId,
}

/// A test's definition exactly as the data layer hands it over.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredBody {
    Text(String),
    Structured(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Test {
    pub id: TestId,
    pub body: StoredBody,
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub route_id: RouteId,
}

// ─── Test definitions ─────────────────────────────────────────────────────────

/// Validated request template plus expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct TestDefinition {
    pub name: Option<String>,
    pub method: Method,
    pub headers: HeaderMap,
    /// `Value::Null` means "send no body".
    pub request_body: Value,
    pub expected_status: u16,
    /// `None` means the body is never compared.
    pub expected_body: Option<Value>,
}

impl TestDefinition {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED_TEST)
    }
}

// ─── Results ──────────────────────────────────────────────────────────────────

/// One immutable row of a test's execution history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: ResultId,
    pub test_id: TestId,
    pub passed: bool,
    pub actual_status: Option<u16>,
    pub actual_body: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A result row that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTestResult {
    pub test_id: TestId,
    pub passed: bool,
    pub actual_status: Option<u16>,
    pub actual_body: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentStatus {
    NeverRun,
    Passed(TestResult),
    Failed(TestResult),
}

impl CurrentStatus {
    pub fn from_latest(latest: Option<TestResult>) -> Self {
        match latest {
            None => CurrentStatus::NeverRun,
            Some(result) if result.passed => CurrentStatus::Passed(result),
            Some(result) => CurrentStatus::Failed(result),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, CurrentStatus::Passed(_))
    }

    pub fn has_run(&self) -> bool {
        !matches!(self, CurrentStatus::NeverRun)
    }

    pub fn latest(&self) -> Option<&TestResult> {
        match self {
            CurrentStatus::NeverRun => None,
            CurrentStatus::Passed(result) | CurrentStatus::Failed(result) => Some(result),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedStats {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub never_run_tests: usize,
    pub percentage: f64,
}

// ─── Execution outcomes ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    AssertionMismatch,
    NetworkError(NetworkError),
    DataError(DataError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Passed,
    Failed(FailureReason),
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Verdict::Passed => OutcomeKind::Passed,
            Verdict::Failed(FailureReason::AssertionMismatch) => OutcomeKind::AssertionMismatch,
            Verdict::Failed(FailureReason::NetworkError(_)) => OutcomeKind::NetworkError,
            Verdict::Failed(FailureReason::DataError(_)) => OutcomeKind::DataError,
        }
    }

    /// Diagnostic text for failures that never produced a comparable response.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Verdict::Failed(FailureReason::NetworkError(err)) => Some(err.to_string()),
            Verdict::Failed(FailureReason::DataError(err)) => Some(err.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Passed,
    AssertionMismatch,
    NetworkError,
    DataError,
}

/// Everything one per-test pipeline produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub test_id: TestId,
    pub name: String,
    pub expected_status: Option<u16>,
    pub expected_body: Option<Value>,
    pub actual_status: Option<u16>,
    pub actual_body: Option<String>,
    pub verdict: Verdict,
    pub duration_ms: u64,
}
