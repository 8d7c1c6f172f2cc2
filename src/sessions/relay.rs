//! Pairwise forwarding of opaque payloads between the two pair members.

use std::fmt;

use super::event::PushEvent;
use super::registry::SessionRegistry;

/// Reasons a payload could not be forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    UnknownSession(String),
    UnknownSender(String),
    UnknownPeer(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSession(id) => write!(f, "Unknown session: {id}"),
            Self::UnknownSender(id) => write!(f, "Sender is not part of the session: {id}"),
            Self::UnknownPeer(id) => write!(f, "Unknown peer: {id}"),
        }
    }
}

impl std::error::Error for RelayError {}

/// Forward `payload` from `sender_id` to `peer_id` in session `session_id`.
///
/// Both parties must currently hold the primary or peer slot; waiting
/// candidates are never reachable. Delivery is at most once and a write to a
/// channel that already ended is silently dropped.
///
/// # Errors
///
/// Returns a [`RelayError`] naming whichever of session, sender or peer could
/// not be resolved. Nothing is written in that case.
pub fn forward(
    registry: &SessionRegistry,
    session_id: &str,
    sender_id: &str,
    peer_id: &str,
    payload: &str,
) -> Result<(), RelayError> {
    let session = registry
        .get(session_id)
        .ok_or_else(|| RelayError::UnknownSession(session_id.to_string()))?;

    if session.pair_member(sender_id).is_none() {
        return Err(RelayError::UnknownSender(sender_id.to_string()));
    }
    let peer = session
        .pair_member(peer_id)
        .filter(|_| peer_id != sender_id)
        .ok_or_else(|| RelayError::UnknownPeer(peer_id.to_string()))?;

    let delivered = peer.channel().send(PushEvent::User {
        sender: sender_id.to_string(),
        payload: payload.to_string(),
    });
    tracing::debug!(
        session_id,
        sender_id,
        peer_id,
        bytes = payload.len(),
        delivered,
        "payload relayed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::channel::{ChannelStream, DEFAULT_HEARTBEAT_INTERVAL, PushChannel};

    fn open(owner: &str) -> (PushChannel, ChannelStream) {
        PushChannel::open(owner, DEFAULT_HEARTBEAT_INTERVAL)
    }

    fn events(stream: &mut ChannelStream) -> Vec<PushEvent> {
        std::iter::from_fn(|| stream.try_recv().ok())
            .filter(|event| *event != PushEvent::Heartbeat)
            .collect()
    }

    /// Session `s1` with alice as primary paired with bob.
    fn paired(registry: &SessionRegistry) -> (ChannelStream, ChannelStream) {
        let (channel, mut alice) = open("alice");
        registry.join_primary("s1", "alice", channel);
        let (channel, mut bob) = open("bob");
        registry.join_waiting("s1", "bob", 5, channel);
        registry.select("s1", "bob");
        events(&mut alice);
        events(&mut bob);
        (alice, bob)
    }

    #[tokio::test]
    async fn delivers_to_the_named_peer_only() {
        let registry = SessionRegistry::default();
        let (mut alice, mut bob) = paired(&registry);

        assert_eq!(forward(&registry, "s1", "alice", "bob", "offer\nline two"), Ok(()));
        assert_eq!(
            events(&mut bob),
            vec![PushEvent::User {
                sender: "alice".to_string(),
                payload: "offer\nline two".to_string(),
            }]
        );
        assert!(events(&mut alice).is_empty());

        assert_eq!(forward(&registry, "s1", "bob", "alice", "answer"), Ok(()));
        assert_eq!(events(&mut alice).len(), 1);
        assert!(events(&mut bob).is_empty());
    }

    #[tokio::test]
    async fn waiting_candidates_are_unreachable() {
        let registry = SessionRegistry::default();
        let (channel, _alice) = open("alice");
        registry.join_primary("s1", "alice", channel);
        let (channel, mut carol) = open("carol");
        registry.join_waiting("s1", "carol", 3, channel);

        assert_eq!(
            forward(&registry, "s1", "alice", "carol", "hello"),
            Err(RelayError::UnknownPeer("carol".to_string()))
        );
        assert_eq!(
            forward(&registry, "s1", "carol", "alice", "hello"),
            Err(RelayError::UnknownSender("carol".to_string()))
        );
        assert!(events(&mut carol).is_empty());
    }

    #[tokio::test]
    async fn unknown_session_and_self_relay_fail() {
        let registry = SessionRegistry::default();
        let (_alice, _bob) = paired(&registry);

        assert_eq!(
            forward(&registry, "nope", "alice", "bob", "x"),
            Err(RelayError::UnknownSession("nope".to_string()))
        );
        assert_eq!(
            forward(&registry, "s1", "alice", "alice", "x"),
            Err(RelayError::UnknownPeer("alice".to_string()))
        );
        assert!(!registry.contains("nope"));
    }

    #[tokio::test]
    async fn relay_after_teardown_fails() {
        let registry = SessionRegistry::default();
        let (_alice, _bob) = paired(&registry);
        registry.quit("s1", "bob");

        assert!(forward(&registry, "s1", "alice", "bob", "x").is_err());
    }
}
