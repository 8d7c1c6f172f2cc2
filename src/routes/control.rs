use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};

use crate::error::AppError;
use crate::routes::target::Target;
use crate::sessions::relay;
use crate::state::AppState;

/// Build the control routes: selection, quitting, kicking and relaying.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/select/{*target}", get(select).post(select))
        .route("/vquit/{*target}", get(quit).post(quit))
        .route("/hquit/{*target}", get(quit).post(quit))
        .route("/kickoff/{*target}", get(kickoff).post(kickoff))
        .route(
            "/ctos/{*target}",
            post(forward_payload).layer(DefaultBodyLimit::disable()),
        )
}

/// `/select/{sessionId}/{userId}` — Promote a waiting candidate to peer.
///
/// Unknown sessions or candidates are ignored.
async fn select(State(state): State<AppState>, target: Target) -> StatusCode {
    if !state.registry.select(&target.session_id, &target.user_id) {
        tracing::debug!(
            session_id = %target.session_id,
            user_id = %target.user_id,
            "select ignored"
        );
    }
    StatusCode::NO_CONTENT
}

/// `/vquit/{sessionId}/{userId}` and `/hquit/...` — Leave the session.
async fn quit(State(state): State<AppState>, target: Target) -> StatusCode {
    state.registry.quit(&target.session_id, &target.user_id);
    StatusCode::NO_CONTENT
}

/// `/kickoff/{sessionId}/{userId}` — Operator removal of a participant.
async fn kickoff(State(state): State<AppState>, target: Target) -> StatusCode {
    if !state.registry.kickoff(&target.session_id, &target.user_id) {
        tracing::debug!(
            session_id = %target.session_id,
            user_id = %target.user_id,
            "kickoff ignored"
        );
    }
    StatusCode::NO_CONTENT
}

/// `POST /ctos/{sessionId}/{senderId}/{peerId}` — Relay the request body to the peer.
///
/// The session is resolved only after the body has been read, so a teardown
/// that happened meanwhile is observed. The body is relayed whatever its size;
/// invalid UTF-8 is replaced rather than refused.
async fn forward_payload(
    State(state): State<AppState>,
    target: Target,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload = String::from_utf8_lossy(&body);
    let peer_id = target
        .extra
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing peer id".to_string()))?;

    relay::forward(
        &state.registry,
        &target.session_id,
        &target.user_id,
        peer_id,
        &payload,
    )?;

    // Some browsers warn about an empty body without a content type
    Ok((StatusCode::NO_CONTENT, [(header::CONTENT_TYPE, "text/plain")]))
}
