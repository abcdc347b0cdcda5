use crate::domain::{ExecutionOutcome, NewTestResult, TestResult};
use crate::error::EngineResult;
use crate::store::ResultStore;
use chrono::{DateTime, Utc};

/// Cut `text` to at most `max_bytes`, never splitting a UTF-8 sequence.
pub fn truncate_body(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Current time at the storage precision (microseconds).
pub fn recording_time() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::<Utc>::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

pub fn build_records(outcomes: &[ExecutionOutcome], recorded_at: DateTime<Utc>) -> Vec<NewTestResult> {
    outcomes
        .iter()
        .map(|outcome| NewTestResult {
            test_id: outcome.test_id,
            passed: outcome.verdict.passed(),
            actual_status: outcome.actual_status,
            actual_body: outcome.actual_body.clone(),
            created_at: recorded_at,
        })
        .collect()
}

/// Persist one result per outcome as a single atomic write.
pub fn record_batch(
    store: &dyn ResultStore,
    outcomes: &[ExecutionOutcome],
) -> EngineResult<Vec<TestResult>> {
    if outcomes.is_empty() {
        return Ok(Vec::new());
    }
    let records = build_records(outcomes, recording_time());
    match store.append_results(&records) {
        Ok(stored) => {
            tracing::debug!(rows = stored.len(), "recorded result batch");
            Ok(stored)
        }
        Err(err) => {
            tracing::error!(rows = records.len(), error = %err, "failed to record result batch");
            Err(err)
        }
    }
}
