//! The waiting pool of candidates attached to a session.

use std::fmt;

use uuid::Uuid;

use super::channel::PushChannel;
use super::event::{PoolListing, PushEvent};

/// Default number of candidates a session keeps waiting.
pub const DEFAULT_POOL_LIMIT: usize = 10;

/// A candidate waiting to be selected.
#[derive(Debug)]
pub struct WaitingEntry {
    pub username: String,
    pub priority: i64,
    pub channel: PushChannel,
}

impl WaitingEntry {
    #[must_use]
    pub fn new(username: impl Into<String>, priority: i64, channel: PushChannel) -> Self {
        Self {
            username: username.into(),
            priority,
            channel,
        }
    }

    fn listing(&self) -> PoolListing {
        PoolListing {
            username: self.username.clone(),
            priority: self.priority,
        }
    }
}

/// How an entry was taken into the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Appended at the end of the pool.
    Added,
    /// The username was already waiting; its channel was replaced in place.
    Rejoined,
}

/// Pool operation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The pool already holds its configured number of entries.
    CapacityExceeded,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded => write!(f, "Waiting pool is full"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Ordered, username-keyed collection of waiting candidates.
///
/// Changes are announced to the session's primary (and only the primary) as a
/// `refresh` event carrying the full ordered listing.
#[derive(Debug)]
pub struct WaitingPool {
    entries: Vec<WaitingEntry>,
    limit: usize,
}

impl Default for WaitingPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_LIMIT)
    }
}

impl WaitingPool {
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit,
        }
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.limit
    }

    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.position(username).is_some()
    }

    /// Listing of every waiting candidate in arrival order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PoolListing> {
        self.entries.iter().map(WaitingEntry::listing).collect()
    }

    /// Admit `entry`, notifying `primary` when the listing changed.
    ///
    /// A username that is already waiting keeps its position and priority and
    /// only has its channel replaced.
    ///
    /// # Errors
    ///
    /// [`PoolError::CapacityExceeded`] if the pool is full. The rejected entry
    /// is dropped, which ends its channel.
    pub fn add(
        &mut self,
        entry: WaitingEntry,
        primary: Option<&PushChannel>,
    ) -> Result<Admission, PoolError> {
        if let Some(pos) = self.position(&entry.username) {
            self.entries[pos].channel.supersede(entry.channel);
            return Ok(Admission::Rejoined);
        }

        if self.is_full() {
            return Err(PoolError::CapacityExceeded);
        }

        self.entries.push(entry);
        self.broadcast(primary);
        Ok(Admission::Added)
    }

    /// Remove `username` if present, notifying `primary`.
    pub fn remove(
        &mut self,
        username: &str,
        primary: Option<&PushChannel>,
    ) -> Option<WaitingEntry> {
        let entry = self.take(username)?;
        self.broadcast(primary);
        Some(entry)
    }

    /// Remove the entry that owns `channel_id`, notifying `primary`.
    ///
    /// Entries whose channel has since been superseded are left alone.
    pub fn remove_channel(
        &mut self,
        channel_id: Uuid,
        primary: Option<&PushChannel>,
    ) -> Option<WaitingEntry> {
        let pos = self
            .entries
            .iter()
            .position(|entry| entry.channel.id() == channel_id)?;
        let entry = self.entries.remove(pos);
        self.broadcast(primary);
        Some(entry)
    }

    /// Remove `username` without announcing the change.
    pub(crate) fn take(&mut self, username: &str) -> Option<WaitingEntry> {
        let pos = self.position(username)?;
        Some(self.entries.remove(pos))
    }

    /// Send `event` to every entry, end every channel and empty the pool.
    pub fn drain_all(&mut self, event: &PushEvent) {
        for mut entry in self.entries.drain(..) {
            entry.channel.send(event.clone());
            entry.channel.kill();
        }
    }

    fn position(&self, username: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.username == username)
    }

    fn broadcast(&self, primary: Option<&PushChannel>) {
        if let Some(primary) = primary {
            primary.send(PushEvent::Refresh(self.snapshot()));
        }
    }
}
