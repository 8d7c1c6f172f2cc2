use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::error::AppError;
use crate::routes::target::Target;
use crate::sessions::{ChannelStream, PushChannel};
use crate::state::AppState;

/// Build the push channel routes: `/vjoin/...` and `/hjoin/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vjoin/{*target}", get(join_primary))
        .route("/hjoin/{*target}", get(join_waiting))
}

/// `GET /vjoin/{sessionId}/{userId}` — Open a push channel as the session's primary.
async fn join_primary(State(state): State<AppState>, target: Target) -> Response {
    let (channel, stream) = open_channel(&state, &target);
    state
        .registry
        .join_primary(&target.session_id, &target.user_id, channel);
    stream_response(stream)
}

/// `GET /hjoin/{sessionId}/{userId}[/{priority}]` — Open a push channel and wait to be selected.
async fn join_waiting(State(state): State<AppState>, target: Target) -> Result<Response, AppError> {
    let priority = target.priority()?;
    let (channel, stream) = open_channel(&state, &target);
    state
        .registry
        .join_waiting(&target.session_id, &target.user_id, priority, channel);
    Ok(stream_response(stream))
}

/// Open a channel whose client-side close is reported back to the registry.
fn open_channel(state: &AppState, target: &Target) -> (PushChannel, ChannelStream) {
    let (mut channel, stream) = PushChannel::open(&target.user_id, state.config.heartbeat_interval);

    let registry = state.registry.clone();
    let session_id = target.session_id.clone();
    let user_id = target.user_id.clone();
    let channel_id = channel.id();
    channel.on_close(move || {
        registry.disconnect(&session_id, &user_id, channel_id);
    });

    (channel, stream)
}

fn stream_response(stream: ChannelStream) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache, no-store"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        Body::from_stream(stream.into_frames()),
    )
        .into_response()
}
