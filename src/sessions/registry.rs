use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::{Ref, RefMut};
use uuid::Uuid;

use super::channel::PushChannel;
use super::pool::DEFAULT_POOL_LIMIT;
use super::session::{JoinOutcome, Session};

/// Process-wide map of session id to [`Session`].
///
/// Every operation runs to completion while holding the session's map entry,
/// and never across an `.await`, so concurrent requests for the same session
/// observe each other's changes atomically. Sessions are removed only by
/// teardown (or when nothing is left in them), never by expiry.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, Session>>,
    pool_limit: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_LIMIT)
    }
}

impl SessionRegistry {
    /// Create an empty registry whose sessions hold up to `pool_limit` candidates.
    #[must_use]
    pub fn new(pool_limit: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            pool_limit,
        }
    }

    /// The existing session `id`, or a fresh empty one.
    ///
    /// A session that was closed but not yet removed counts as absent and is
    /// replaced under the same entry lock.
    pub fn get_or_create(&self, id: &str) -> RefMut<'_, String, Session> {
        match self.sessions.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_closed() {
                    tracing::debug!(session_id = id, "replacing closed session");
                    entry.insert(Session::new(id, self.pool_limit));
                }
                entry.into_ref()
            }
            Entry::Vacant(entry) => entry.insert(Session::new(id, self.pool_limit)),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Ref<'_, String, Session>> {
        self.sessions.get(id)
    }

    /// Detach session `id`. Dropping it ends every channel it still holds.
    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn join_primary(
        &self,
        session_id: &str,
        user_id: &str,
        channel: PushChannel,
    ) -> JoinOutcome {
        let outcome = self
            .get_or_create(session_id)
            .join_primary(user_id, channel);
        self.reap(session_id);
        outcome
    }

    pub fn join_waiting(
        &self,
        session_id: &str,
        user_id: &str,
        priority: i64,
        channel: PushChannel,
    ) -> JoinOutcome {
        let outcome = self
            .get_or_create(session_id)
            .join_waiting(user_id, priority, channel);
        self.reap(session_id);
        outcome
    }

    /// Promote `username` in session `session_id`. Unknown targets are a no-op.
    pub fn select(&self, session_id: &str, username: &str) -> bool {
        self.with_session(session_id, |session| session.select(username))
            .unwrap_or(false)
    }

    pub fn quit(&self, session_id: &str, user_id: &str) -> bool {
        self.with_session(session_id, |session| session.quit(user_id))
            .unwrap_or(false)
    }

    pub fn kickoff(&self, session_id: &str, user_id: &str) -> bool {
        self.with_session(session_id, |session| session.kickoff(user_id))
            .unwrap_or(false)
    }

    /// Close-hook entry point for a channel whose client went away.
    pub fn disconnect(&self, session_id: &str, user_id: &str, channel_id: Uuid) -> bool {
        self.with_session(session_id, |session| session.disconnect(user_id, channel_id))
            .unwrap_or(false)
    }

    /// Close every session and empty the registry.
    pub fn shutdown(&self) {
        let ids: Vec<String> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
        for id in ids {
            if let Some((_, mut session)) = self.sessions.remove(&id) {
                session.close_all("");
            }
        }
    }

    fn with_session<R>(
        &self,
        session_id: &str,
        op: impl FnOnce(&mut Session) -> R,
    ) -> Option<R> {
        let result = self
            .sessions
            .get_mut(session_id)
            .map(|mut session| op(session.value_mut()));
        self.reap(session_id);
        result
    }

    /// Drop session `session_id` if it was closed or nothing is left in it.
    fn reap(&self, session_id: &str) {
        let removed = self
            .sessions
            .remove_if(session_id, |_, session| session.is_closed() || session.is_vacant());
        if removed.is_some() {
            tracing::debug!(session_id, remaining = self.sessions.len(), "session removed");
        }
    }
}
