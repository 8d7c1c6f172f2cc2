//! Session lifecycle: one primary, at most one paired peer and a waiting pool.

use std::fmt;

use uuid::Uuid;

use super::channel::PushChannel;
use super::event::PushEvent;
use super::pool::{Admission, PoolError, WaitingEntry, WaitingPool};

/// Observable lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No primary yet. Candidates may already be waiting.
    Empty,
    /// A primary is present and no candidate has been selected.
    AwaitingMatch,
    /// Primary and peer are paired. The pool is permanently empty.
    Active,
    /// Torn down. Every channel has been ended.
    Closed,
}

/// Why a join request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Another identity already holds the primary slot.
    PrimaryOccupied,
    /// The identity already holds a different role in this session.
    IdentityInUse,
    /// A peer has been selected, no more candidates are taken.
    Started,
    /// The waiting pool is at capacity.
    PoolFull,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryOccupied => write!(f, "primary slot is taken"),
            Self::IdentityInUse => write!(f, "identity already holds another role"),
            Self::Started => write!(f, "session already started"),
            Self::PoolFull => write!(f, "waiting pool is full"),
        }
    }
}

impl From<PoolError> for Rejection {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::CapacityExceeded => Self::PoolFull,
        }
    }
}

/// Result of a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Installed as the session's primary.
    Installed,
    /// Added to the end of the waiting pool.
    Queued,
    /// Replaced the channel of an identity already present.
    Superseded,
    /// Turned away; the channel was notified and ended.
    Rejected(Rejection),
}

/// A paired participant and its channel.
#[derive(Debug)]
pub struct Participant {
    user_id: String,
    channel: PushChannel,
}

impl Participant {
    #[must_use]
    pub fn new(user_id: impl Into<String>, channel: PushChannel) -> Self {
        Self {
            user_id: user_id.into(),
            channel,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub const fn channel(&self) -> &PushChannel {
        &self.channel
    }

    fn owns(&self, user_id: &str, channel_id: Uuid) -> bool {
        self.user_id == user_id && self.channel.id() == channel_id
    }

    fn end_with(mut self, event: PushEvent) {
        self.channel.send(event);
        self.channel.kill();
    }
}

/// A pairing session.
///
/// Holds at most one primary and one peer. Once a peer is selected the session
/// is `started` for good and never takes candidates again. When either pair
/// member leaves, the whole session is torn down.
#[derive(Debug)]
pub struct Session {
    id: String,
    primary: Option<Participant>,
    peer: Option<Participant>,
    pool: WaitingPool,
    started: bool,
    closed: bool,
}

impl Session {
    #[must_use]
    pub fn new(id: impl Into<String>, pool_limit: usize) -> Self {
        Self {
            id: id.into(),
            primary: None,
            peer: None,
            pool: WaitingPool::new(pool_limit),
            started: false,
            closed: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        if self.closed {
            SessionState::Closed
        } else if self.peer.is_some() {
            SessionState::Active
        } else if self.primary.is_some() {
            SessionState::AwaitingMatch
        } else {
            SessionState::Empty
        }
    }

    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Nothing is tracked: no primary, no peer, nobody waiting.
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        !self.closed && self.primary.is_none() && self.peer.is_none() && self.pool.is_empty()
    }

    #[must_use]
    pub const fn primary(&self) -> Option<&Participant> {
        self.primary.as_ref()
    }

    #[must_use]
    pub const fn peer(&self) -> Option<&Participant> {
        self.peer.as_ref()
    }

    #[must_use]
    pub const fn pool(&self) -> &WaitingPool {
        &self.pool
    }

    /// The primary or peer with identity `user_id`.
    #[must_use]
    pub fn pair_member(&self, user_id: &str) -> Option<&Participant> {
        [self.primary.as_ref(), self.peer.as_ref()]
            .into_iter()
            .flatten()
            .find(|participant| participant.user_id == user_id)
    }

    /// Install `user_id` as the primary.
    ///
    /// A reconnect of the current primary only swaps the channel and catches
    /// the new channel up on the current pairing or pool.
    pub fn join_primary(&mut self, user_id: &str, channel: PushChannel) -> JoinOutcome {
        if let Some(primary) = self.primary.as_mut() {
            if primary.user_id != user_id {
                return self.reject(user_id, channel, Rejection::PrimaryOccupied);
            }

            primary.channel.supersede(channel);
            if let Some(peer) = &self.peer {
                primary.channel.send(PushEvent::Join(peer.user_id.clone()));
            } else if !self.pool.is_empty() {
                primary.channel.send(PushEvent::Refresh(self.pool.snapshot()));
            }
            tracing::info!(session_id = %self.id, user_id, "primary rejoined");
            return JoinOutcome::Superseded;
        }

        if self.pool.contains(user_id) {
            return self.reject(user_id, channel, Rejection::IdentityInUse);
        }

        let primary = Participant::new(user_id, channel);
        if !self.pool.is_empty() {
            primary.channel.send(PushEvent::Refresh(self.pool.snapshot()));
        }
        self.primary = Some(primary);
        tracing::info!(
            session_id = %self.id,
            user_id,
            waiting = self.pool.len(),
            "primary joined"
        );
        JoinOutcome::Installed
    }

    /// Put `user_id` in the waiting pool.
    pub fn join_waiting(
        &mut self,
        user_id: &str,
        priority: i64,
        channel: PushChannel,
    ) -> JoinOutcome {
        if self.started {
            return self.reject(user_id, channel, Rejection::Started);
        }
        if self.pair_member(user_id).is_some() {
            return self.reject(user_id, channel, Rejection::IdentityInUse);
        }
        if self.pool.is_full() && !self.pool.contains(user_id) {
            return self.reject(user_id, channel, Rejection::PoolFull);
        }

        let entry = WaitingEntry::new(user_id, priority, channel);
        let primary = self.primary.as_ref().map(Participant::channel);
        match self.pool.add(entry, primary) {
            Ok(Admission::Added) => {
                tracing::info!(
                    session_id = %self.id,
                    user_id,
                    priority,
                    waiting = self.pool.len(),
                    "candidate waiting"
                );
                JoinOutcome::Queued
            }
            Ok(Admission::Rejoined) => {
                tracing::info!(session_id = %self.id, user_id, "candidate rejoined");
                JoinOutcome::Superseded
            }
            Err(err) => JoinOutcome::Rejected(err.into()),
        }
    }

    /// Promote `username` from the pool to peer and discard everyone else.
    ///
    /// Returns `false` (and changes nothing) when there is no primary, the
    /// session already started, or `username` is not waiting.
    pub fn select(&mut self, username: &str) -> bool {
        if self.started || self.closed {
            return false;
        }
        let Some(primary) = self.primary.as_mut() else {
            return false;
        };
        let Some(entry) = self.pool.take(username) else {
            return false;
        };

        let peer = Participant::new(entry.username, entry.channel);
        self.started = true;

        primary.channel.restart_heartbeat();
        primary.channel.send(PushEvent::Join(peer.user_id.clone()));
        peer.channel.send(PushEvent::Join(primary.user_id.clone()));
        tracing::info!(
            session_id = %self.id,
            primary = %primary.user_id,
            peer = %peer.user_id,
            discarded = self.pool.len(),
            "peer selected"
        );

        self.peer = Some(peer);
        self.pool.drain_all(&PushEvent::Kicked);
        true
    }

    /// Explicit quit by `user_id`.
    ///
    /// A pair member leaving closes the session; a candidate leaving only
    /// leaves the pool.
    pub fn quit(&mut self, user_id: &str) -> bool {
        if self.pair_member(user_id).is_some() {
            self.close_all(user_id);
            return true;
        }

        let primary = self.primary.as_ref().map(Participant::channel);
        let Some(entry) = self.pool.remove(user_id, primary) else {
            return false;
        };
        tracing::info!(session_id = %self.id, user_id, "candidate quit");
        Participant::new(entry.username, entry.channel)
            .end_with(PushEvent::Quit(user_id.to_string()));
        true
    }

    /// Operator removal of `user_id`.
    pub fn kickoff(&mut self, user_id: &str) -> bool {
        if let Some(target) = self.take_pair_member(user_id) {
            tracing::info!(session_id = %self.id, user_id, "pair member kicked");
            target.end_with(PushEvent::Kicked);
            for remaining in [&self.primary, &self.peer].into_iter().flatten() {
                remaining.channel.send(PushEvent::Leave(user_id.to_string()));
            }
            self.close_all(user_id);
            return true;
        }

        let primary = self.primary.as_ref().map(Participant::channel);
        let Some(entry) = self.pool.remove(user_id, primary) else {
            return false;
        };
        tracing::info!(session_id = %self.id, user_id, "candidate kicked");
        Participant::new(entry.username, entry.channel)
            .end_with(PushEvent::Quit(user_id.to_string()));
        true
    }

    /// The client side of channel `channel_id`, owned by `user_id`, went away.
    ///
    /// Acts only if that channel is still the one tracked for the identity;
    /// a superseded or already removed channel is ignored.
    pub fn disconnect(&mut self, user_id: &str, channel_id: Uuid) -> bool {
        let is_pair_channel = [self.primary.as_ref(), self.peer.as_ref()]
            .into_iter()
            .flatten()
            .any(|participant| participant.owns(user_id, channel_id));
        if is_pair_channel {
            tracing::info!(session_id = %self.id, user_id, "pair member disconnected");
            self.close_all(user_id);
            return true;
        }

        let primary = self.primary.as_ref().map(Participant::channel);
        if self.pool.remove_channel(channel_id, primary).is_some() {
            tracing::info!(session_id = %self.id, user_id, "candidate disconnected");
            return true;
        }
        false
    }

    /// Cascade teardown: `quit` to every tracked channel, end them all and
    /// mark the session closed.
    pub fn close_all(&mut self, departing: &str) {
        let notice = PushEvent::Quit(departing.to_string());
        for participant in [self.primary.take(), self.peer.take()].into_iter().flatten() {
            participant.end_with(notice.clone());
        }
        self.pool.drain_all(&notice);
        self.closed = true;
        tracing::info!(session_id = %self.id, departing, "session closed");
    }

    fn take_pair_member(&mut self, user_id: &str) -> Option<Participant> {
        if self.primary.as_ref().is_some_and(|p| p.user_id == user_id) {
            self.primary.take()
        } else if self.peer.as_ref().is_some_and(|p| p.user_id == user_id) {
            self.peer.take()
        } else {
            None
        }
    }

    /// Notify `channel` why it was turned away and end it.
    fn reject(&self, user_id: &str, mut channel: PushChannel, reason: Rejection) -> JoinOutcome {
        tracing::warn!(session_id = %self.id, user_id, %reason, "join rejected");
        let notice = match reason {
            Rejection::PoolFull => PushEvent::Busy(self.id.clone()),
            _ => PushEvent::Quit(String::new()),
        };
        channel.send(notice);
        channel.kill();
        JoinOutcome::Rejected(reason)
    }
}
