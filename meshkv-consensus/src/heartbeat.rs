use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How many consecutive missed heartbeats mark a peer `Dead` (§4.4).
pub const MISSED_HEARTBEATS_BEFORE_DEAD: u32 = 3;

/// Tracks the last time each peer (or, on a follower, the leader) was
/// heard from, and how many heartbeat intervals have elapsed with
/// silence. Used on the leader side to flag followers unreachable for
/// catch-up, and on the follower side to decide when to start a
/// campaign.
pub struct HeartbeatTracker {
    heartbeat_interval: Duration,
    last_seen: RwLock<HashMap<String, Instant>>,
}

impl HeartbeatTracker {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self { heartbeat_interval, last_seen: RwLock::new(HashMap::new()) }
    }

    pub fn record_seen(&self, peer_id: &str) {
        self.last_seen.write().insert(peer_id.to_string(), Instant::now());
    }

    pub fn missed_count(&self, peer_id: &str) -> u32 {
        let seen = self.last_seen.read();
        match seen.get(peer_id) {
            None => MISSED_HEARTBEATS_BEFORE_DEAD,
            Some(last) => {
                let elapsed = last.elapsed();
                (elapsed.as_millis() / self.heartbeat_interval.as_millis().max(1)) as u32
            }
        }
    }

    pub fn is_dead(&self, peer_id: &str) -> bool {
        self.missed_count(peer_id) >= MISSED_HEARTBEATS_BEFORE_DEAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_peer_is_immediately_dead() {
        let tracker = HeartbeatTracker::new(Duration::from_millis(50));
        assert!(tracker.is_dead("node-a"));
    }

    #[test]
    fn recently_seen_peer_is_alive() {
        let tracker = HeartbeatTracker::new(Duration::from_millis(50));
        tracker.record_seen("node-a");
        assert!(!tracker.is_dead("node-a"));
    }
}
