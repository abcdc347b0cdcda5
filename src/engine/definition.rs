//! Decoding of stored test definitions.
//!
//! Stored bodies come from generated or hand-edited JSON and are untrusted:
//! they may be a JSON string, an already structured value, a double-encoded
//! string, or garbage. Decoding never panics and never performs I/O.

use crate::domain::{StoredBody, TestDefinition};
use crate::error::DataError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::{Map, Value};

const NAME_KEYS: [&str; 2] = ["test_name", "name"];
const METHOD_KEYS: [&str; 2] = ["request_method", "method"];
const HEADER_KEYS: [&str; 2] = ["request_headers", "headers"];
const BODY_KEYS: [&str; 2] = ["request_body", "requestBody"];
const EXPECTED_STATUS_KEYS: [&str; 2] = ["expected_status_code", "expectedStatus"];
const EXPECTED_BODY_KEYS: [&str; 2] = ["expected_response_body", "expectedBody"];

pub fn parse_definition(stored: &StoredBody) -> Result<TestDefinition, DataError> {
    match stored {
        StoredBody::Text(text) => parse_definition_text(text),
        StoredBody::Structured(value) => decode_value(value),
    }
}

pub fn parse_definition_text(text: &str) -> Result<TestDefinition, DataError> {
    let value: Value = serde_json::from_str(text).map_err(|_| DataError::InvalidJson)?;
    decode_value(&value)
}

/// Accepts an object, or a string holding a JSON-encoded object.
pub fn decode_value(value: &Value) -> Result<TestDefinition, DataError> {
    match value {
        Value::Object(map) => decode_map(map),
        Value::String(inner) => {
            let nested: Value = serde_json::from_str(inner).map_err(|_| DataError::InvalidJson)?;
            match nested {
                Value::Object(map) => decode_map(&map),
                _ => Err(DataError::NotAnObject),
            }
        }
        _ => Err(DataError::NotAnObject),
    }
}

fn decode_map(map: &Map<String, Value>) -> Result<TestDefinition, DataError> {
    let method = decode_method(lookup(map, &METHOD_KEYS))?;
    let expected_status = decode_status(lookup(map, &EXPECTED_STATUS_KEYS))?;
    let headers = decode_headers(lookup(map, &HEADER_KEYS))?;

    let name = match lookup(map, &NAME_KEYS) {
        Some(Value::String(name)) if !name.trim().is_empty() => Some(name.clone()),
        _ => None,
    };
    let request_body = lookup(map, &BODY_KEYS)
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    let expected_body = lookup(map, &EXPECTED_BODY_KEYS)
        .filter(|value| !value.is_null())
        .cloned();

    Ok(TestDefinition {
        name,
        method,
        headers,
        request_body,
        expected_status,
        expected_body,
    })
}

/// First key present wins; `null` counts as absent.
fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

fn decode_method(value: Option<&Value>) -> Result<Method, DataError> {
    let raw = match value {
        None => return Err(DataError::MissingMethod),
        Some(Value::String(raw)) => raw.trim(),
        Some(other) => return Err(DataError::InvalidMethod(other.to_string())),
    };
    if raw.is_empty() {
        return Err(DataError::MissingMethod);
    }
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| DataError::InvalidMethod(raw.to_string()))
}

fn decode_status(value: Option<&Value>) -> Result<u16, DataError> {
    let code = match value {
        None => return Err(DataError::MissingExpectedStatus),
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    code.filter(|code| (100..=999).contains(code))
        .map(|code| code as u16)
        .ok_or(DataError::InvalidExpectedStatus)
}

fn decode_headers(value: Option<&Value>) -> Result<HeaderMap, DataError> {
    let map = match value {
        None => return Ok(HeaderMap::new()),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(DataError::InvalidHeaders(
                "expected an object of name/value pairs".to_string(),
            ))
        }
    };

    let mut headers = HeaderMap::with_capacity(map.len());
    for (key, value) in map {
        let text = match value {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => {
                return Err(DataError::InvalidHeaders(format!(
                    "value for `{key}` must be a string"
                )))
            }
        };
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|err| DataError::InvalidHeaders(format!("header name `{key}`: {err}")))?;
        let value = HeaderValue::from_str(&text)
            .map_err(|err| DataError::InvalidHeaders(format!("header value for `{key}`: {err}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
