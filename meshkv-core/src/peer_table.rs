use dashmap::DashMap;

use crate::node_info::PeerInfo;

/// Concurrent identity → `PeerInfo` mapping (§4.2).
///
/// Entries are never deleted (peers are marked `Dead`, not removed), so
/// `remove` exists only for the IP→identity reconciliation this table
/// performs internally.
#[derive(Default)]
pub struct PeerTable {
    inner: DashMap<String, PeerInfo>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<PeerInfo> {
        self.inner.get(id).map(|r| r.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains_key(id)
    }

    pub fn remove(&self, id: &str) -> Option<PeerInfo> {
        self.inner.remove(id).map(|(_, v)| v)
    }

    pub fn values(&self) -> Vec<PeerInfo> {
        self.inner.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Insert or update a peer record keyed by its stable identity. If an
    /// entry for the same peer is still keyed by its raw IP (the state
    /// left behind by the initial "hi" handshake, before the peer's
    /// stable identity was known), that IP-keyed entry is dropped —
    /// the discovery reconciliation rule from §4.2/§4.9.
    pub fn set(&self, id: String, info: PeerInfo) {
        let ip = info.ip.clone();
        self.inner.insert(id.clone(), info);
        if ip != id && self.inner.contains_key(&ip) {
            self.inner.remove(&ip);
        }
    }

    /// Count of peers currently known to be `Alive`, used by the
    /// minimum-node election gate.
    pub fn alive_count(&self) -> usize {
        self.inner
            .iter()
            .filter(|r| r.value().status == crate::node_info::Status::Alive)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_info::{NodeInfo, RaftRole, Role, Status};

    fn info(id: &str, ip: &str) -> PeerInfo {
        NodeInfo {
            id: id.to_string(),
            ip: ip.to_string(),
            group: "default".to_string(),
            name: id.to_string(),
            status: Status::Alive,
            role: Role::AnyRole,
            raft_role: RaftRole::Follower,
            last_log_id: 0,
            last_service_log_id: 0,
            version: "0".to_string(),
            score: 0,
            score_count: 0,
        }
    }

    #[test]
    fn ip_keyed_entry_is_reconciled_on_identity_update() {
        let table = PeerTable::new();
        table.set("10.0.0.5".to_string(), info("10.0.0.5", "10.0.0.5"));
        assert!(table.contains("10.0.0.5"));

        table.set("node-a".to_string(), info("node-a", "10.0.0.5"));
        assert!(table.contains("node-a"));
        assert!(!table.contains("10.0.0.5"));
    }

    #[test]
    fn never_deletes_on_status_change() {
        let table = PeerTable::new();
        table.set("node-a".to_string(), info("node-a", "10.0.0.5"));
        let mut dead = table.get("node-a").unwrap();
        dead.status = Status::Dead;
        table.set("node-a".to_string(), dead);
        assert!(table.contains("node-a"));
        assert_eq!(table.alive_count(), 0);
    }
}
