//! Execution orchestrator.
//!
//! Each scheduled test runs in its own task: decode, execute, judge. Every
//! failure inside a task becomes a value, so one bad definition or one dead
//! endpoint never stops its siblings. All tasks are joined before the batch
//! is handed to the recorder in one write.

use super::compare::judge;
use super::definition::parse_definition;
use super::http::{HttpExecutor, PreparedRequest, ReqwestExecutor};
use super::recorder::{record_batch, truncate_body};
use crate::config::EngineConfig;
use crate::domain::{
    ExecutionOutcome, FailureReason, Test, TestResult, Verdict, UNNAMED_TEST,
};
use crate::error::{EngineError, EngineResult, NetworkError, NetworkErrorKind};
use crate::store::ResultStore;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Extra headroom over the client timeout before a task is force-failed.
const TASK_GRACE: Duration = Duration::from_secs(1);

/// A test paired with the absolute URL it will be fired at.
#[derive(Debug, Clone)]
pub struct ScheduledTest {
    pub test: Test,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct BatchRun {
    /// Ascending test id, regardless of completion order.
    pub outcomes: Vec<ExecutionOutcome>,
    pub records: Vec<TestResult>,
}

impl BatchRun {
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.verdict.passed()).count()
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<EngineConfig>,
    executor: Arc<dyn HttpExecutor>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let executor = ReqwestExecutor::new(&config).map_err(EngineError::Client)?;
        Ok(Self::with_executor(config, Arc::new(executor)))
    }

    pub fn with_executor(config: EngineConfig, executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            config: Arc::new(config),
            executor,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fan out one task per test and wait for all of them.
    pub async fn execute_batch(&self, scheduled: Vec<ScheduledTest>) -> Vec<ExecutionOutcome> {
        let started = Instant::now();
        let total = scheduled.len();
        tracing::info!(tests = total, "starting test batch");

        let mut handles = Vec::with_capacity(total);
        for item in scheduled {
            let test_id = item.test.id;
            let executor = self.executor.clone();
            let config = self.config.clone();
            let handle = tokio::spawn(async move { run_one(executor, &config, item).await });
            handles.push((test_id, handle));
        }

        let mut outcomes = Vec::with_capacity(total);
        for (test_id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(test_id, error = %err, "test task crashed");
                    crashed_outcome(test_id, &err.to_string())
                }
            };
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|outcome| outcome.test_id);

        let passed = outcomes.iter().filter(|o| o.verdict.passed()).count();
        tracing::info!(
            tests = total,
            passed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "finished test batch"
        );
        outcomes
    }

    /// Execute the batch, then persist one result per test atomically.
    pub async fn run_batch(
        &self,
        store: &dyn ResultStore,
        scheduled: Vec<ScheduledTest>,
    ) -> EngineResult<BatchRun> {
        let outcomes = self.execute_batch(scheduled).await;
        let records = record_batch(store, &outcomes)?;
        Ok(BatchRun { outcomes, records })
    }
}

async fn run_one(
    executor: Arc<dyn HttpExecutor>,
    config: &EngineConfig,
    scheduled: ScheduledTest,
) -> ExecutionOutcome {
    let started = Instant::now();
    let ScheduledTest { test, url } = scheduled;

    let definition = match parse_definition(&test.body) {
        Ok(definition) => definition,
        Err(err) => {
            tracing::warn!(test_id = test.id, reason = %err, "skipping unusable test definition");
            return ExecutionOutcome {
                test_id: test.id,
                name: UNNAMED_TEST.to_string(),
                expected_status: None,
                expected_body: None,
                actual_status: None,
                actual_body: Some(err.to_string()),
                verdict: Verdict::Failed(FailureReason::DataError(err)),
                duration_ms: started.elapsed().as_millis() as u64,
            };
        }
    };

    let request = PreparedRequest::new(&definition, url);
    let deadline = config.request_timeout() + TASK_GRACE;
    let response = match tokio::time::timeout(deadline, executor.execute(request)).await {
        Ok(response) => response,
        Err(_) => Err(NetworkError::new(
            NetworkErrorKind::Timeout,
            format!("Request timed out after {} ms", deadline.as_millis()),
        )),
    };

    let verdict = judge(&definition, &response, config.compare_mode);
    let (actual_status, actual_body) = match &response {
        Ok(snapshot) => {
            tracing::debug!(
                test_id = test.id,
                kind = ?verdict.kind(),
                status = snapshot.status,
                "test finished"
            );
            (
                Some(snapshot.status),
                Some(truncate_body(&snapshot.body, config.max_stored_body_bytes)),
            )
        }
        Err(err) => {
            tracing::warn!(test_id = test.id, kind = ?err.kind, error = %err, "request did not complete");
            (
                None,
                Some(truncate_body(&err.to_string(), config.max_stored_body_bytes)),
            )
        }
    };

    ExecutionOutcome {
        test_id: test.id,
        name: definition.display_name().to_string(),
        expected_status: Some(definition.expected_status),
        expected_body: definition.expected_body.clone(),
        actual_status,
        actual_body,
        verdict,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

fn crashed_outcome(test_id: i64, message: &str) -> ExecutionOutcome {
    let err = NetworkError::new(
        NetworkErrorKind::RequestError,
        format!("Test execution aborted: {message}"),
    );
    ExecutionOutcome {
        test_id,
        name: UNNAMED_TEST.to_string(),
        expected_status: None,
        expected_body: None,
        actual_status: None,
        actual_body: Some(err.to_string()),
        verdict: Verdict::Failed(FailureReason::NetworkError(err)),
        duration_ms: 0,
    }
}
