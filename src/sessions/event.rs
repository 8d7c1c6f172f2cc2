//! Events pushed to clients and their text-stream framing.
//!
//! Every event is written as `event:<name>` followed by one `data:` line per
//! line of payload and a blank line. Heartbeats are bare comment lines.

use std::fmt::Write as _;

use serde::Serialize;

/// Data carried by `kicked` events. Clients only look at the event name.
pub const KICKED_SENTINEL: &str = "data";

/// One waiting candidate as listed in a `refresh` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolListing {
    pub username: String,
    pub priority: i64,
}

/// An event delivered over a push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// Keep-open comment frame.
    Heartbeat,
    /// The counterpart of a newly formed pair.
    Join(String),
    /// The other pair member was removed by an operator.
    Leave(String),
    /// The channel (and usually the session) is ending. Carries the departing
    /// identity, or nothing when the receiver itself was turned away.
    Quit(String),
    /// The receiver was kicked or discarded by a selection.
    Kicked,
    /// The session cannot take another candidate.
    Busy(String),
    /// Ordered snapshot of the waiting pool, sent to the primary.
    Refresh(Vec<PoolListing>),
    /// Relayed payload from another participant.
    User { sender: String, payload: String },
}

impl PushEvent {
    /// The `event:` field, or `None` for comment frames.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        let name = match self {
            Self::Heartbeat => return None,
            Self::Join(_) => "join",
            Self::Leave(_) => "leave",
            Self::Quit(_) => "quit",
            Self::Kicked => "kicked",
            Self::Busy(_) => "busy",
            Self::Refresh(_) => "refresh",
            Self::User { sender, .. } => return Some(format!("user-{sender}")),
        };
        Some(name.to_string())
    }

    /// Render the event as a complete stream frame.
    #[must_use]
    pub fn encode(&self) -> String {
        let Some(name) = self.name() else {
            return ":\n".to_string();
        };

        let data = match self {
            Self::Heartbeat => String::new(),
            Self::Join(who) | Self::Leave(who) | Self::Quit(who) | Self::Busy(who) => who.clone(),
            Self::Kicked => KICKED_SENTINEL.to_string(),
            Self::Refresh(listing) => {
                serde_json::to_string(listing).unwrap_or_else(|_| "[]".to_string())
            }
            Self::User { payload, .. } => payload.clone(),
        };

        let mut frame = format!("event:{name}\n");
        for line in data_lines(&data) {
            let _ = writeln!(frame, "data:{line}");
        }
        frame.push('\n');
        frame
    }
}

/// Split a payload into protocol data lines. `\r\n`, `\r` and `\n` all end a line.
fn data_lines(data: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = data;
    while let Some(pos) = rest.find(['\r', '\n']) {
        lines.push(&rest[..pos]);
        let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[pos + skip..];
    }
    lines.push(rest);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_is_a_comment_line() {
        assert_eq!(PushEvent::Heartbeat.encode(), ":\n");
        assert_eq!(PushEvent::Heartbeat.name(), None);
    }

    #[test]
    fn join_frame() {
        assert_eq!(
            PushEvent::Join("bob".to_string()).encode(),
            "event:join\ndata:bob\n\n"
        );
    }

    #[test]
    fn empty_quit_still_has_a_data_line() {
        assert_eq!(PushEvent::Quit(String::new()).encode(), "event:quit\ndata:\n\n");
    }

    #[test]
    fn kicked_carries_sentinel() {
        assert_eq!(PushEvent::Kicked.encode(), "event:kicked\ndata:data\n\n");
    }

    #[test]
    fn refresh_is_ordered_json() {
        let event = PushEvent::Refresh(vec![
            PoolListing {
                username: "bob".to_string(),
                priority: 5,
            },
            PoolListing {
                username: "carol".to_string(),
                priority: 3,
            },
        ]);
        assert_eq!(
            event.encode(),
            concat!(
                "event:refresh\n",
                "data:[{\"username\":\"bob\",\"priority\":5},",
                "{\"username\":\"carol\",\"priority\":3}]\n\n",
            )
        );
    }

    #[test]
    fn relayed_payload_keeps_every_line() {
        let event = PushEvent::User {
            sender: "alice".to_string(),
            payload: "v=0\r\no=- 1 2 IN IP4 0.0.0.0\ns=-\r\rend".to_string(),
        };
        assert_eq!(
            event.encode(),
            "event:user-alice\ndata:v=0\ndata:o=- 1 2 IN IP4 0.0.0.0\ndata:s=-\ndata:\ndata:end\n\n"
        );
    }

    #[test]
    fn trailing_newline_yields_empty_last_line() {
        assert_eq!(data_lines("a\n"), vec!["a", ""]);
        assert_eq!(data_lines(""), vec![""]);
    }
}
