//! Pass/fail judgement.
//!
//! `Status` compares only the status code. `StatusAndBody` additionally
//! requires the parsed response body to equal `expected_body` exactly
//! (object key order is ignored, extra or missing fields are not) whenever
//! the definition carries one.

use super::http::HttpResponseSnapshot;
use crate::domain::{FailureReason, TestDefinition, Verdict};
use crate::error::NetworkError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    #[default]
    Status,
    StatusAndBody,
}

pub fn judge(
    definition: &TestDefinition,
    response: &Result<HttpResponseSnapshot, NetworkError>,
    mode: CompareMode,
) -> Verdict {
    let snapshot = match response {
        Ok(snapshot) => snapshot,
        Err(err) => return Verdict::Failed(FailureReason::NetworkError(err.clone())),
    };

    if snapshot.status != definition.expected_status {
        return Verdict::Failed(FailureReason::AssertionMismatch);
    }

    if mode == CompareMode::StatusAndBody {
        if let Some(expected) = &definition.expected_body {
            if !body_matches(expected, &snapshot.body) {
                return Verdict::Failed(FailureReason::AssertionMismatch);
            }
        }
    }

    Verdict::Passed
}

/// Non-JSON bodies are compared as a JSON string.
pub fn body_matches(expected: &Value, actual_text: &str) -> bool {
    let actual = serde_json::from_str::<Value>(actual_text)
        .unwrap_or_else(|_| Value::String(actual_text.to_string()));
    actual == *expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkErrorKind;
    use reqwest::header::HeaderMap;
    use reqwest::Method;
    use serde_json::json;

    fn definition(expected_body: Option<Value>) -> TestDefinition {
        TestDefinition {
            name: None,
            method: Method::GET,
            headers: HeaderMap::new(),
            request_body: json!({}),
            expected_status: 200,
            expected_body,
        }
    }

    fn ok(status: u16, body: &str) -> Result<HttpResponseSnapshot, NetworkError> {
        Ok(HttpResponseSnapshot {
            status,
            body: body.to_string(),
        })
    }

    #[test]
    fn status_mode_ignores_body() {
        let def = definition(Some(json!({"ok": true})));
        assert_eq!(judge(&def, &ok(200, "nope"), CompareMode::Status), Verdict::Passed);
        assert_eq!(
            judge(&def, &ok(500, "{}"), CompareMode::Status),
            Verdict::Failed(FailureReason::AssertionMismatch)
        );
    }

    #[test]
    fn strict_mode_compares_parsed_bodies() {
        let def = definition(Some(json!({"a": 1, "b": [1, 2]})));
        assert_eq!(
            judge(&def, &ok(200, r#"{"b":[1,2],"a":1}"#), CompareMode::StatusAndBody),
            Verdict::Passed
        );
        assert_eq!(
            judge(
                &def,
                &ok(200, r#"{"a":1,"b":[1,2],"c":0}"#),
                CompareMode::StatusAndBody
            ),
            Verdict::Failed(FailureReason::AssertionMismatch)
        );
    }

    #[test]
    fn strict_mode_without_expected_body_checks_status_only() {
        let def = definition(None);
        assert_eq!(
            judge(&def, &ok(200, "anything"), CompareMode::StatusAndBody),
            Verdict::Passed
        );
    }

    #[test]
    fn plain_text_body_compares_as_string() {
        assert!(body_matches(&json!("pong"), "pong"));
        assert!(!body_matches(&json!({"pong": true}), "pong"));
    }

    #[test]
    fn network_error_never_passes() {
        let err = NetworkError::new(NetworkErrorKind::Timeout, "timed out");
        let verdict = judge(&definition(None), &Err(err.clone()), CompareMode::Status);
        assert_eq!(verdict, Verdict::Failed(FailureReason::NetworkError(err)));
    }
}
