use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::sessions::RelayError;

/// Unified application error type that maps to JSON HTTP responses.
///
/// Error format: `{ "error": { "code": "...", "message": "..." } }`.
#[derive(Debug)]
pub enum AppError {
    /// 400 Bad Request: missing or malformed identifiers in the request path
    BadRequest(String),
    /// 400 Bad Request: relay sender, peer or session could not be resolved
    Relay(RelayError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            Self::BadRequest(msg) => ("BAD_REQUEST", msg),
            Self::Relay(err) => ("UNKNOWN_PEER", err.to_string()),
        };
        tracing::debug!(code, %message, "request rejected");

        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            })),
        )
            .into_response()
    }
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        Self::Relay(err)
    }
}
