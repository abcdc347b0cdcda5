//! Loopback HTTP fixtures for tests.

use axum::http::StatusCode;
use axum::Router;
use tokio::net::TcpListener;

/// Serve `status` + `body` on every path; returns the base URL.
pub async fn spawn_stub_server(status: u16, body: &'static str) -> String {
    let status = StatusCode::from_u16(status).expect("stub status");
    let app = Router::new().fallback(move || async move {
        (status, [("content-type", "application/json")], body)
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{addr}")
}

/// A URL on a port nothing is listening on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{addr}/unreachable")
}
