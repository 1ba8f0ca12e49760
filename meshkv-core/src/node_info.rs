use serde::{Deserialize, Serialize};

/// Configured role: what this node is *allowed* to become.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum Role {
    /// May become Candidate/Leader like any other node.
    AnyRole = 0,
    /// Never assumes raft-role Leader, may still become Candidate.
    NeverLeader = 1,
    /// Never leaves Follower, regardless of election outcome.
    AlwaysFollower = 2,
}

impl Role {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Role::AnyRole),
            1 => Some(Role::NeverLeader),
            2 => Some(Role::AlwaysFollower),
            _ => None,
        }
    }

    pub fn may_campaign(self) -> bool {
        matches!(self, Role::AnyRole | Role::NeverLeader)
    }

    pub fn may_lead(self) -> bool {
        matches!(self, Role::AnyRole)
    }
}

/// Runtime raft-role, driven by the election engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaftRole {
    Follower,
    Candidate,
    Leader,
}

impl std::fmt::Display for RaftRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RaftRole::Follower => "follower",
            RaftRole::Candidate => "candidate",
            RaftRole::Leader => "leader",
        };
        f.write_str(s)
    }
}

/// Liveness as observed through the heartbeat engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Alive,
    Dead,
}

/// The piece of a node's state that is gossiped on the wire: every `Msg`
/// carries the sender's current `NodeInfo` so receivers can opportunistically
/// refresh their peer table from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    pub ip: String,
    pub group: String,
    pub name: String,
    pub status: Status,
    pub role: Role,
    pub raft_role: RaftRole,
    pub last_log_id: i64,
    pub last_service_log_id: i64,
    pub version: String,
    pub score: i64,
    pub score_count: i32,
}

impl NodeInfo {
    /// `(LastLogId, ScoreCount, Score)` lexicographic key used at every
    /// election decision (§4.3 comparison order).
    pub fn leadership_key(&self) -> (i64, i32, i64) {
        (self.last_log_id, self.score_count, self.score)
    }
}

/// A peer table entry: a snapshot of another node's state as last observed.
///
/// Structurally identical to `NodeInfo` (the wire carries exactly this),
/// kept as a distinct type because its lifecycle differs: created on
/// first "hi" keyed by IP, rekeyed by stable identity, mutated on every
/// heartbeat reply, marked `Dead` on repeated timeout, never deleted.
pub type PeerInfo = NodeInfo;
