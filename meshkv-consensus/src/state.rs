use std::sync::atomic::{AtomicI64, Ordering};

use meshkv_core::RaftRole;

/// The leadership-ranking key a node currently advertises: `LastLogId`
/// breaks ties first (a node further ahead in the log wins), then
/// `ScoreCount`, then raw `Score` (§4.3). None of these carry a term —
/// the comparison is purely by how far ahead and how many times a node
/// has won, not by any notion of epoch.
pub type LeadershipKey = (i64, i32, i64);

/// This node's mutable raft-election state. Composite fields (role
/// transitions) stay behind a lock upstream in the owning task; the
/// scalar counters here are independently-updated atomics, matching
/// the concurrency split the spec calls for (§5/§9): no single giant
/// mutex serializes unrelated fields against each other.
pub struct ElectionState {
    role: parking_lot::Mutex<RaftRole>,
    score: AtomicI64,
    score_count: AtomicI64,
    last_log_id: AtomicI64,
}

impl ElectionState {
    pub fn new() -> Self {
        Self {
            role: parking_lot::Mutex::new(RaftRole::Follower),
            score: AtomicI64::new(0),
            score_count: AtomicI64::new(0),
            last_log_id: AtomicI64::new(-1),
        }
    }

    pub fn role(&self) -> RaftRole {
        *self.role.lock()
    }

    pub fn set_role(&self, role: RaftRole) {
        *self.role.lock() = role;
    }

    pub fn score(&self) -> i64 {
        self.score.load(Ordering::SeqCst)
    }

    pub fn set_score(&self, score: i64) {
        self.score.store(score, Ordering::SeqCst);
    }

    pub fn score_count(&self) -> i64 {
        self.score_count.load(Ordering::SeqCst)
    }

    pub fn increment_score_count(&self) -> i64 {
        self.score_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset_score_count(&self) {
        self.score_count.store(0, Ordering::SeqCst);
    }

    pub fn last_log_id(&self) -> i64 {
        self.last_log_id.load(Ordering::SeqCst)
    }

    pub fn set_last_log_id(&self, id: i64) {
        self.last_log_id.fetch_max(id, Ordering::SeqCst);
    }

    pub fn leadership_key(&self) -> LeadershipKey {
        (
            self.last_log_id.load(Ordering::SeqCst),
            self.score_count.load(Ordering::SeqCst) as i32,
            self.score.load(Ordering::SeqCst),
        )
    }
}

impl Default for ElectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare a remote candidate's leadership key against our own. Returns
/// `true` if the remote should be preferred over us. On an exact tie the
/// local node wins — the spec's literal comparison order (§4.3), which
/// the original implementation's own docs flag as a likely bug, but it's
/// normative behavior here, not a redesign target.
pub fn remote_outranks_local(remote: LeadershipKey, local: LeadershipKey) -> bool {
    remote > local
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_last_log_id_wins_regardless_of_score() {
        assert!(remote_outranks_local((10, 0, 0), (5, 100, 100)));
        assert!(!remote_outranks_local((5, 100, 100), (10, 0, 0)));
    }

    #[test]
    fn score_count_breaks_last_log_id_tie() {
        assert!(remote_outranks_local((5, 3, 0), (5, 2, 100)));
    }

    #[test]
    fn exact_tie_prefers_local_node() {
        assert!(!remote_outranks_local((5, 2, 9), (5, 2, 9)));
    }

    #[test]
    fn election_state_tracks_leadership_key() {
        let state = ElectionState::new();
        state.set_last_log_id(3);
        state.increment_score_count();
        state.set_score(7);
        assert_eq!(state.leadership_key(), (3, 1, 7));
    }
}
