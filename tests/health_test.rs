mod common;

use axum::http::StatusCode;

use signal_broker::config::Config;
use signal_broker::state::AppState;

#[tokio::test]
async fn health_returns_200() {
    let (app, _state) = common::test_app();
    let (status, body) = common::get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["sessions"], 0);
}

#[tokio::test]
async fn health_counts_open_sessions() {
    let (app, _state) = common::test_app();
    let (_, _, _alice) = common::open_stream(&app, "/vjoin/s1/alice").await;
    let (_, _, _dave) = common::open_stream(&app, "/vjoin/s2/dave").await;

    let (_, body) = common::get(&app, "/health").await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
    assert_eq!(json["sessions"], 2);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let (app, _state) = common::test_app();
    let (status, _body) = common::get(&app, "/nonexistent.html").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn client_files_are_served() {
    let dir = std::env::temp_dir().join(format!("signal-broker-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap_or_default();
    std::fs::write(dir.join("index.html"), "<h1>broker</h1>").unwrap_or_default();

    let state = AppState::new(Config {
        client_dir: dir.clone(),
        ..Config::default()
    });
    let app = signal_broker::routes::router().with_state(state);

    let (status, body) = common::get(&app, "/index.html").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>broker</h1>");

    let (status, body) = common::get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>broker</h1>");

    std::fs::remove_dir_all(&dir).unwrap_or_default();
}
