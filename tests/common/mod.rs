use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use signal_broker::config::Config;
use signal_broker::state::AppState;

/// How long to wait for a frame before assuming none is coming.
const FRAME_TIMEOUT: Duration = Duration::from_millis(300);

/// Heartbeat frame written on open and periodically afterwards.
pub const HEARTBEAT: &str = ":\n";

/// Build the app router with default configuration; the state shares its registry.
pub fn test_app() -> (Router, AppState) {
    test_app_with(Config::default())
}

pub fn test_app_with(config: Config) -> (Router, AppState) {
    let state = AppState::new(Config {
        client_dir: "test_client_missing".into(),
        ..config
    });
    let app = signal_broker::routes::router().with_state(state.clone());
    (app, state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Body) -> axum::response::Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .unwrap_or_default();

    app.clone().oneshot(request).await.unwrap_or_default()
}

async fn collect(response: axum::response::Response) -> (StatusCode, String) {
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();
    let body_str = String::from_utf8(body.to_vec()).unwrap_or_default();

    (status, body_str)
}

/// Test helper: send a GET request to the app and return (status, body).
pub async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    collect(send(app, "GET", uri, Body::empty()).await).await
}

/// Test helper: send a POST request with a plain text body and return (status, body).
pub async fn post_text(app: &Router, uri: &str, text: &str) -> (StatusCode, String) {
    collect(send(app, "POST", uri, Body::from(text.to_string())).await).await
}

/// Test helper: send a POST request with a raw body and return (status, body).
pub async fn post_bytes(app: &Router, uri: &str, bytes: Vec<u8>) -> (StatusCode, String) {
    collect(send(app, "POST", uri, Body::from(bytes)).await).await
}

/// Open a push channel and return (status, content type, streaming body).
pub async fn open_stream(app: &Router, uri: &str) -> (StatusCode, String, Body) {
    let response = send(app, "GET", uri, Body::empty()).await;
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    (status, content_type, response.into_body())
}

/// Next frame of a streaming body, or `None` if it ended or nothing arrived in time.
pub async fn next_frame(body: &mut Body) -> Option<String> {
    let frame = tokio::time::timeout(FRAME_TIMEOUT, body.frame())
        .await
        .ok()??
        .ok()?;
    let data = frame.into_data().ok()?;
    String::from_utf8(data.to_vec()).ok()
}

/// Next non-heartbeat frame.
pub async fn next_event(body: &mut Body) -> Option<String> {
    loop {
        let frame = next_frame(body).await?;
        if frame != HEARTBEAT {
            return Some(frame);
        }
    }
}

/// Whether the stream has ended, after skipping whatever is still queued.
pub async fn is_ended(body: &mut Body) -> bool {
    loop {
        match tokio::time::timeout(FRAME_TIMEOUT, body.frame()).await {
            Ok(None) => return true,
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(_))) | Err(_) => return false,
        }
    }
}

/// Let spawned close hooks run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
