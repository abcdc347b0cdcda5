//! Intake of machine-generated test candidates.
//!
//! The generator itself is a black box that returns free text. Models tend
//! to wrap JSON in prose or code fences, so the payload is sliced out from
//! the first opening bracket to the last closing one before decoding.

use super::definition::decode_value;
use crate::domain::{ProjectId, TestDefinition};
use crate::error::{DataError, EngineError, EngineResult};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>>;

pub trait TestGenerator: Send + Sync {
    /// Raw model output for a free-text description of an API.
    fn generate(&self, prompt: &str) -> GenerateFuture<'_>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCandidate {
    pub project_id: Option<ProjectId>,
    pub route: Option<String>,
    /// The candidate's `body` as produced, for storing verbatim once accepted.
    pub raw_body: Option<Value>,
    pub definition: Result<TestDefinition, DataError>,
}

pub async fn generate_candidates(
    generator: &dyn TestGenerator,
    prompt: &str,
) -> EngineResult<Vec<GeneratedCandidate>> {
    if prompt.trim().is_empty() {
        return Ok(Vec::new());
    }
    let raw = generator
        .generate(prompt)
        .await
        .map_err(EngineError::Generator)?;
    let candidates = extract_candidates(&raw)
        .map_err(|err| EngineError::Generator(format!("unusable generator output: {err}")))?;

    let rejected = candidates.iter().filter(|c| c.definition.is_err()).count();
    tracing::info!(
        candidates = candidates.len(),
        rejected,
        "decoded generated test candidates"
    );
    Ok(candidates)
}

pub fn extract_candidates(raw: &str) -> Result<Vec<GeneratedCandidate>, DataError> {
    let start = [raw.find('{'), raw.find('[')]
        .into_iter()
        .flatten()
        .min()
        .ok_or(DataError::InvalidJson)?;
    let end = [raw.rfind('}'), raw.rfind(']')]
        .into_iter()
        .flatten()
        .max()
        .ok_or(DataError::InvalidJson)?;
    if end < start {
        return Err(DataError::InvalidJson);
    }

    let payload: Value =
        serde_json::from_str(&raw[start..=end]).map_err(|_| DataError::InvalidJson)?;
    let items = match payload {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        _ => return Err(DataError::NotAnObject),
    };

    Ok(items.into_iter().map(candidate_from_value).collect())
}

fn candidate_from_value(item: Value) -> GeneratedCandidate {
    let Value::Object(map) = item else {
        return GeneratedCandidate {
            project_id: None,
            route: None,
            raw_body: None,
            definition: Err(DataError::NotAnObject),
        };
    };

    let project_id = map.get("project_id").and_then(Value::as_i64);
    let route = map
        .get("route")
        .and_then(Value::as_str)
        .map(str::to_string);
    let raw_body = map.get("body").filter(|body| !body.is_null()).cloned();
    let definition = match &raw_body {
        Some(body) => decode_value(body),
        None => Err(DataError::MissingBody),
    };

    GeneratedCandidate {
        project_id,
        route,
        raw_body,
        definition,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    struct CannedGenerator(Result<String, String>);

    impl TestGenerator for CannedGenerator {
        fn generate(&self, _prompt: &str) -> GenerateFuture<'_> {
            let reply = self.0.clone();
            Box::pin(async move { reply })
        }
    }

    const LIST_REPLY: &str = r#"Sure! Here are your tests:
```json
[
  {"project_id": 1, "route": "/login", "body": {
    "test_name": "valid login",
    "request_method": "POST",
    "request_body": {"user": "a", "password": "b"},
    "expected_status_code": 200
  }},
  {"project_id": 1, "route": "/login", "body": {"test_name": "no method", "expected_status_code": 400}},
  {"project_id": 1, "route": "/login"}
]
```"#;

    #[test]
    fn extracts_list_wrapped_in_prose() {
        let candidates = extract_candidates(LIST_REPLY).expect("candidates");
        assert_eq!(candidates.len(), 3);

        let first = &candidates[0];
        assert_eq!(first.project_id, Some(1));
        assert_eq!(first.route.as_deref(), Some("/login"));
        let definition = first.definition.as_ref().expect("valid");
        assert_eq!(definition.method, Method::POST);
        assert_eq!(definition.display_name(), "valid login");

        assert_eq!(candidates[1].definition, Err(DataError::MissingMethod));
        assert_eq!(candidates[2].definition, Err(DataError::MissingBody));
    }

    #[test]
    fn accepts_single_object_reply() {
        let reply = r#"{"route": "/ping", "body": "{\"request_method\":\"GET\",\"expected_status_code\":200}"}"#;
        let candidates = extract_candidates(reply).expect("candidates");
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].definition.is_ok());
    }

    #[test]
    fn reply_without_json_is_rejected() {
        assert_eq!(
            extract_candidates("I cannot help with that.").unwrap_err(),
            DataError::InvalidJson
        );
        assert_eq!(extract_candidates("} oops {").unwrap_err(), DataError::InvalidJson);
    }

    #[tokio::test]
    async fn empty_prompt_skips_generator() {
        let generator = CannedGenerator(Err("should not be called".to_string()));
        let candidates = generate_candidates(&generator, "   ").await.expect("empty");
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn generator_failure_is_reported() {
        let generator = CannedGenerator(Err("quota exceeded".to_string()));
        let err = generate_candidates(&generator, "a login api").await.unwrap_err();
        assert!(matches!(err, EngineError::Generator(message) if message == "quota exceeded"));
    }

    #[tokio::test]
    async fn generator_output_is_decoded() {
        let generator = CannedGenerator(Ok(LIST_REPLY.to_string()));
        let candidates = generate_candidates(&generator, "a login api").await.expect("ok");
        assert_eq!(candidates.iter().filter(|c| c.definition.is_ok()).count(), 1);
    }
}
