use serde::{Deserialize, Serialize};

use meshkv_core::NodeInfo;

/// What kind of exchange a `Msg` carries. Every message, regardless of
/// head, piggybacks the sender's current `NodeInfo` (§4.2/§4.9) so a
/// single handshake or heartbeat doubles as a peer-table update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Head {
    /// Initial discovery handshake.
    Hi,
    /// Reply to `Hi`, used by the sender to detect it dialed itself.
    Hi2,
    Heartbeat,
    HeartbeatReply,
    /// Advertise this node's current leadership key to a peer.
    Score,
    ScoreReply,
    /// A `LogEntry` pushed by the leader to a follower.
    ReplLogEntry,
    ReplResponse,
    /// A follower asking the leader to replay everything after its
    /// `LastLogId`.
    ReplCatchupRequest,
    ReplCatchupResponse,
    /// A follower's local configuration change, forwarded to the leader
    /// since only the leader assigns log ids.
    ReplReconfigFromFollower,
    RaftResponse,
}

/// The single framed unit exchanged over both the raft port and the
/// repl port (§6). `body` is the head-specific JSON payload, already
/// encoded — kept as a string rather than a second generic so the
/// outer frame never needs to know the inner shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Msg {
    pub head: Head,
    pub body: String,
    pub info: NodeInfo,
}

impl Msg {
    pub fn new(head: Head, body: impl Into<String>, info: NodeInfo) -> Self {
        Self { head, body: body.into(), info }
    }

    pub fn empty(head: Head, info: NodeInfo) -> Self {
        Self { head, body: String::new(), info }
    }

    pub fn decode_body<T: for<'de> Deserialize<'de>>(&self) -> Option<T> {
        serde_json::from_str(&self.body).ok()
    }

    pub fn with_body<T: Serialize>(head: Head, body: &T, info: NodeInfo) -> Option<Self> {
        serde_json::to_string(body).ok().map(|b| Msg::new(head, b, info))
    }
}
