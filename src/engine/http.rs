use crate::config::EngineConfig;
use crate::domain::TestDefinition;
use crate::error::{NetworkError, NetworkErrorKind};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Join a base URL and a route path with exactly one separating slash.
pub fn join_url(base_url: &str, route: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim().trim_end_matches('/'),
        route.trim().trim_start_matches('/')
    )
}

/// One fully resolved outbound request.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl PreparedRequest {
    pub fn new(definition: &TestDefinition, url: impl Into<String>) -> Self {
        let body = if should_send_body(&definition.method) && !definition.request_body.is_null() {
            Some(definition.request_body.clone())
        } else {
            None
        };

        Self {
            method: definition.method.clone(),
            url: url.into(),
            headers: definition.headers.clone(),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponseSnapshot {
    pub status: u16,
    /// At most `max_stored_body_bytes` of the decoded body.
    pub body: String,
}

pub type ExecuteFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponseSnapshot, NetworkError>> + Send + 'a>>;

/// Issues exactly one request per call. Implementations must not retry.
pub trait HttpExecutor: Send + Sync {
    fn execute(&self, request: PreparedRequest) -> ExecuteFuture<'_>;
}

/// Executor backed by one shared, connection-pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
    max_body_bytes: usize,
}

impl ReqwestExecutor {
    pub fn new(config: &EngineConfig) -> Result<Self, String> {
        Ok(Self {
            client: build_client(config)?,
            max_body_bytes: config.max_stored_body_bytes,
        })
    }
}

impl HttpExecutor for ReqwestExecutor {
    fn execute(&self, request: PreparedRequest) -> ExecuteFuture<'_> {
        Box::pin(send_prepared(&self.client, request, self.max_body_bytes))
    }
}

pub fn build_client(config: &EngineConfig) -> Result<Client, String> {
    let mut builder = Client::builder()
        .timeout(config.request_timeout())
        .user_agent(config.user_agent.clone());

    builder = if config.follow_redirects {
        builder.redirect(reqwest::redirect::Policy::limited(10))
    } else {
        builder.redirect(reqwest::redirect::Policy::none())
    };

    if !config.verify_ssl {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|err| format!("Failed to build HTTP client: {err}"))
}

fn should_send_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

async fn send_prepared(
    client: &Client,
    request: PreparedRequest,
    max_body_bytes: usize,
) -> Result<HttpResponseSnapshot, NetworkError> {
    let mut headers = request.headers;
    let mut builder = client.request(request.method, &request.url);
    if let Some(body) = request.body {
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        let payload = serde_json::to_vec(&body).map_err(|err| {
            NetworkError::new(
                NetworkErrorKind::RequestError,
                format!("Failed to encode request body: {err}"),
            )
        })?;
        builder = builder.body(payload);
    }
    builder = builder.headers(headers);

    let response = builder.send().await.map_err(|err| {
        NetworkError::new(classify_reqwest_error(&err), format!("Request failed: {err}"))
    })?;

    let status = response.status().as_u16();
    let bytes = read_capped(response, max_body_bytes).await.map_err(|err| {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else {
            NetworkErrorKind::ReadError
        };
        NetworkError::new(kind, format!("Failed to read response: {err}"))
    })?;

    Ok(HttpResponseSnapshot {
        status,
        body: decode_body(&bytes),
    })
}

/// Pull chunks until the body ends or `limit` bytes are buffered.
async fn read_capped(mut response: Response, limit: usize) -> Result<Vec<u8>, reqwest::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// A cap can land inside a multi-byte sequence; drop that partial tail.
fn decode_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(err) if err.error_len().is_none() => {
            String::from_utf8_lossy(&bytes[..err.valid_up_to()]).into_owned()
        }
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

pub fn classify_reqwest_error(err: &reqwest::Error) -> NetworkErrorKind {
    if err.is_timeout() {
        return NetworkErrorKind::Timeout;
    }

    let message = error_chain_text(err).to_ascii_lowercase();
    if message.contains("dns") || message.contains("failed to lookup address") {
        return NetworkErrorKind::DnsError;
    }
    if message.contains("tls") || message.contains("ssl") || message.contains("certificate") {
        return NetworkErrorKind::TlsError;
    }
    if err.is_connect() {
        return NetworkErrorKind::ConnectError;
    }
    if err.is_builder() || err.is_request() {
        return NetworkErrorKind::RequestError;
    }

    NetworkErrorKind::ReadError
}

fn error_chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{refused_url, spawn_stub_server};
    use serde_json::json;

    fn definition(method: Method) -> TestDefinition {
        TestDefinition {
            name: None,
            method,
            headers: HeaderMap::new(),
            request_body: json!({"k": "v"}),
            expected_status: 200,
            expected_body: None,
        }
    }

    #[test]
    fn join_url_uses_exactly_one_slash() {
        assert_eq!(join_url("http://a.com", "login"), "http://a.com/login");
        assert_eq!(join_url("http://a.com/", "/login"), "http://a.com/login");
        assert_eq!(join_url("http://a.com//", "//login"), "http://a.com/login");
        assert_eq!(join_url("http://a.com", "/login"), "http://a.com/login");
        assert_eq!(join_url("http://a.com/", "login"), "http://a.com/login");
        assert_eq!(
            join_url("http://a.com/api/", "v1/users/"),
            "http://a.com/api/v1/users/"
        );
    }

    #[test]
    fn body_is_dropped_for_safe_methods() {
        assert!(PreparedRequest::new(&definition(Method::GET), "http://a").body.is_none());
        assert!(PreparedRequest::new(&definition(Method::HEAD), "http://a").body.is_none());
        assert_eq!(
            PreparedRequest::new(&definition(Method::POST), "http://a").body,
            Some(json!({"k": "v"}))
        );

        let mut null_body = definition(Method::PUT);
        null_body.request_body = Value::Null;
        assert!(PreparedRequest::new(&null_body, "http://a").body.is_none());
    }

    #[test]
    fn partial_utf8_tail_is_dropped() {
        let text = "a\u{e9}";
        assert_eq!(decode_body(&text.as_bytes()[..2]), "a");
        assert_eq!(decode_body(text.as_bytes()), text);
    }

    #[tokio::test]
    async fn executes_against_live_endpoint() {
        let base = spawn_stub_server(201, r#"{"created":true}"#).await;
        let executor = ReqwestExecutor::new(&EngineConfig::default()).expect("client");

        let snapshot = executor
            .execute(PreparedRequest::new(
                &definition(Method::POST),
                join_url(&base, "/items"),
            ))
            .await
            .expect("response");

        assert_eq!(snapshot.status, 201);
        assert_eq!(snapshot.body, r#"{"created":true}"#);
    }

    #[tokio::test]
    async fn response_body_is_read_up_to_the_cap() {
        let base = spawn_stub_server(200, "0123456789abcdefghij").await;
        let config = EngineConfig {
            max_stored_body_bytes: 8,
            ..EngineConfig::default()
        };
        let executor = ReqwestExecutor::new(&config).expect("client");

        let snapshot = executor
            .execute(PreparedRequest::new(&definition(Method::GET), base))
            .await
            .expect("response");

        assert_eq!(snapshot.body, "01234567");
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let url = refused_url().await;
        let executor = ReqwestExecutor::new(&EngineConfig::default()).expect("client");

        let err = executor
            .execute(PreparedRequest::new(&definition(Method::GET), url))
            .await
            .unwrap_err();

        assert_eq!(err.kind, NetworkErrorKind::ConnectError);
        assert!(err.message.starts_with("Request failed"));
    }
}
