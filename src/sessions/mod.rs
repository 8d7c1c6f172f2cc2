//! In-memory pairing sessions.
//!
//! A session has one primary, a pool of waiting candidates and, once the
//! primary selects a candidate, exactly one peer. Every participant holds a
//! server-to-client push channel; payloads are relayed only between the
//! primary and the peer.

pub mod channel;
pub mod event;
pub mod pool;
pub mod registry;
pub mod relay;
pub mod session;

pub use channel::{ChannelStream, DEFAULT_HEARTBEAT_INTERVAL, PushChannel};
pub use event::{PoolListing, PushEvent};
pub use pool::{DEFAULT_POOL_LIMIT, WaitingEntry, WaitingPool};
pub use registry::SessionRegistry;
pub use relay::RelayError;
pub use session::{JoinOutcome, Rejection, Session, SessionState};
