use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Tracks, from the leader's side, how far each follower has
/// acknowledged and which followers currently need a catch-up replay
/// (§4.8/§4.9: replication here is best-effort, not quorum-blocking — a
/// follower that misses a push is flagged rather than retried inline).
#[derive(Default)]
pub struct ProgressTracker {
    acked: RwLock<HashMap<String, i64>>,
    needs_catchup: RwLock<HashSet<String>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ack(&self, peer_id: &str, log_id: i64) {
        self.acked.write().insert(peer_id.to_string(), log_id);
        self.needs_catchup.write().remove(peer_id);
    }

    pub fn record_unreachable(&self, peer_id: &str) {
        self.needs_catchup.write().insert(peer_id.to_string());
    }

    pub fn acked_log_id(&self, peer_id: &str) -> Option<i64> {
        self.acked.read().get(peer_id).copied()
    }

    pub fn needs_catchup(&self, peer_id: &str) -> bool {
        self.needs_catchup.read().contains(peer_id)
    }

    pub fn peers_needing_catchup(&self) -> Vec<String> {
        self.needs_catchup.read().iter().cloned().collect()
    }

    pub fn clear_catchup(&self, peer_id: &str) {
        self.needs_catchup.write().remove(peer_id);
    }

    /// Lowest id acknowledged across every peer we've heard from, used
    /// only for observability — nothing in the replication path blocks
    /// on this the way a quorum commit index would.
    pub fn min_acked(&self) -> Option<i64> {
        self.acked.read().values().copied().min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_peer_is_flagged_until_acked() {
        let tracker = ProgressTracker::new();
        tracker.record_unreachable("node-a");
        assert!(tracker.needs_catchup("node-a"));
        tracker.record_ack("node-a", 42);
        assert!(!tracker.needs_catchup("node-a"));
        assert_eq!(tracker.acked_log_id("node-a"), Some(42));
    }

    #[test]
    fn min_acked_ignores_peers_never_heard_from() {
        let tracker = ProgressTracker::new();
        tracker.record_ack("a", 10);
        tracker.record_ack("b", 5);
        assert_eq!(tracker.min_acked(), Some(5));
    }
}
