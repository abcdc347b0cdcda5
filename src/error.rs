//! Error types shared across the engine.

use serde::Serialize;

/// Why a stored test definition could not be turned into a runnable request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    #[error("invalid JSON")]
    InvalidJson,
    #[error("definition must be a JSON object")]
    NotAnObject,
    #[error("missing request_method")]
    MissingMethod,
    #[error("invalid request_method `{0}`")]
    InvalidMethod(String),
    #[error("missing expected_status_code")]
    MissingExpectedStatus,
    #[error("invalid expected_status_code")]
    InvalidExpectedStatus,
    #[error("invalid request_headers: {0}")]
    InvalidHeaders(String),
    #[error("missing body")]
    MissingBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkErrorKind {
    Timeout,
    DnsError,
    ConnectError,
    TlsError,
    ReadError,
    RequestError,
}

/// Transport-level failure while executing a single test request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct NetworkError {
    pub kind: NetworkErrorKind,
    pub message: String,
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("caller is not allowed to access {entity} {id}")]
    Unauthorized { entity: &'static str, id: i64 },
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Client(String),
    #[error("test generator failed: {0}")]
    Generator(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn unauthorized(entity: &'static str, id: i64) -> Self {
        Self::Unauthorized { entity, id }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
