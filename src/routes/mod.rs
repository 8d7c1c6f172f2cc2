mod channel;
mod control;
mod health;
pub mod target;

use axum::Router;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::error::AppError;
use crate::state::AppState;

/// Build the complete application router.
///
/// Structure:
/// - `GET /health` — lightweight health check
/// - `GET /vjoin|hjoin/{sessionId}/{userId}[/{extra}]` — push channels
/// - `/select|vquit|hquit|kickoff/{sessionId}/{userId}` — session control
/// - `POST /ctos/{sessionId}/{senderId}/{peerId}` — payload relay
/// - anything else — static files from the client directory
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(channel::router())
        .merge(control::router())
        .fallback(fallback)
}

/// Verb paths that did not match a route lack identifiers; the rest is static content.
async fn fallback(State(state): State<AppState>, request: Request) -> Response {
    if target::is_verb_path(request.uri().path()) {
        return AppError::BadRequest("Missing session or user id".to_string()).into_response();
    }

    ServeDir::new(&state.config.client_dir)
        .oneshot(request)
        .await
        .into_response()
}
