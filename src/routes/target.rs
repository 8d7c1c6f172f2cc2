use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

/// Verbs served under `/<verb>/<sessionId>/<userId>[/<extra>]`.
pub const VERBS: [&str; 7] = ["vjoin", "hjoin", "select", "ctos", "vquit", "hquit", "kickoff"];

/// Whether `path` starts with one of the [`VERBS`].
#[must_use]
pub fn is_verb_path(path: &str) -> bool {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .is_some_and(|first| VERBS.contains(&first))
}

/// The `<sessionId>/<userId>[/<extra>]` part of a verb path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub session_id: String,
    pub user_id: String,
    pub extra: Option<String>,
}

impl Target {
    /// Parse the path segments following the verb.
    ///
    /// # Errors
    ///
    /// [`AppError::BadRequest`] if the session or user id is missing or empty,
    /// or if any segment contains a line break.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let mut segments = raw.split('/');
        let session_id = identifier(segments.next(), "session id")?;
        let user_id = identifier(segments.next(), "user id")?;
        let extra = match segments.next().filter(|segment| !segment.is_empty()) {
            Some(extra) => Some(identifier(Some(extra), "path segment")?),
            None => None,
        };

        Ok(Self {
            session_id,
            user_id,
            extra,
        })
    }

    /// Parse a full request path such as `/vjoin/s1/alice`.
    ///
    /// Segments are taken as sent, without percent-decoding, so an encoded
    /// `/` stays inside its identifier.
    ///
    /// # Errors
    ///
    /// Same as [`Target::parse`].
    pub fn from_path(path: &str) -> Result<Self, AppError> {
        let after_verb = path
            .trim_start_matches('/')
            .split_once('/')
            .map_or("", |(_, rest)| rest);
        Self::parse(after_verb)
    }

    /// The candidate priority carried in the extra segment; 0 when absent.
    ///
    /// # Errors
    ///
    /// [`AppError::BadRequest`] if the segment is not an integer.
    pub fn priority(&self) -> Result<i64, AppError> {
        self.extra.as_deref().map_or(Ok(0), |raw| {
            raw.parse()
                .map_err(|_| AppError::BadRequest(format!("Invalid priority: {raw}")))
        })
    }
}

fn identifier(segment: Option<&str>, what: &str) -> Result<String, AppError> {
    match segment {
        None | Some("") => Err(AppError::BadRequest(format!("Missing {what}"))),
        Some(value) if value.contains(['\r', '\n']) => {
            Err(AppError::BadRequest(format!("Invalid {what}")))
        }
        Some(value) => Ok(value.to_string()),
    }
}

impl<S> FromRequestParts<S> for Target
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_path(parts.uri.path())
    }
}
