use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use meshkv_consensus::{
    heartbeat_interval, remote_outranks_local, ElectionState, ElectionTimeoutConfig,
    HeartbeatTracker, LogIdGenerator,
};
use meshkv_core::{
    Error, KvStore, LogEntry, NodeInfo, Op, PeerTable, RaftRole, Result, Role, ServiceDescriptor,
    ServiceRegistry, Status,
};
use meshkv_replication::{
    needs_catchup_replay, should_apply, should_replicate_to, ConfigPushQueue, ProgressTracker,
};
use meshkv_storage::{Compress, LogStore, StateStore};

use crate::config::NodeConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DataSnapshot {
    last_log_id: i64,
    data: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServiceSnapshot {
    last_service_log_id: i64,
    services: HashMap<String, ServiceDescriptor>,
}

/// The composition root (§5/§9's re-architecture from one giant
/// mutex-guarded struct into task-owned state plus a handful of
/// independently-lockable pieces). Long-lived background tasks (the
/// election loop, the heartbeat loop, the two flush loops, the
/// config-replication retry loop) each hold an `Arc<Node>` and touch
/// only the fields relevant to them.
pub struct Node {
    pub config: NodeConfig,
    pub id: String,
    self_ip: RwLock<String>,
    pub peers: PeerTable,
    pub kv: KvStore,
    pub services: ServiceRegistry,
    pub election: ElectionState,
    pub heartbeats: HeartbeatTracker,
    pub progress: ProgressTracker,
    pub config_queue: ConfigPushQueue,
    pub log_store: LogStore,
    data_snapshot_store: StateStore,
    service_snapshot_store: StateStore,
    last_service_log_id: std::sync::atomic::AtomicI64,
    leader_id: RwLock<Option<String>>,
    log_id_gen: RwLock<Option<LogIdGenerator>>,
    election_timeout: ElectionTimeoutConfig,
    shutting_down: AtomicBool,
}

impl Node {
    /// Build a fresh node and recover whatever state is on disk: replay
    /// the log, then fold each recovered entry into the data map or
    /// service registry depending on its type, so both snapshots and
    /// the log agree even if they were taken at different times
    /// (§4.6/§4.7 recovery ordering).
    pub fn bootstrap(config: NodeConfig) -> Result<Arc<Self>> {
        std::fs::create_dir_all(&config.save_path)?;
        std::fs::create_dir_all(&config.log_path)?;

        let (log_store, recovered) = LogStore::open(config.log_path.clone())?;

        let data_store =
            StateStore::new(config.save_path.join("meshkv.data.db"), Compress::Disabled);
        let service_store =
            StateStore::new(config.save_path.join("meshkv.service.db"), Compress::Disabled);

        let kv = KvStore::new();
        let services = ServiceRegistry::new();

        let mut last_data_log_id = -1i64;
        let mut last_service_log_id = -1i64;

        if let Some(snapshot) = data_store.load::<DataSnapshot>()? {
            kv.load(snapshot.data);
            last_data_log_id = snapshot.last_log_id;
        }
        if let Some(snapshot) = service_store.load::<ServiceSnapshot>()? {
            services.load(snapshot.services);
            last_service_log_id = snapshot.last_service_log_id;
        }

        let replay_from = last_data_log_id.min(last_service_log_id);
        for entry in &recovered {
            if entry.id <= replay_from {
                continue;
            }
            apply_op_to_state(&kv, &services, &entry.op);
            if entry.op.is_service_op() {
                last_service_log_id = last_service_log_id.max(entry.id);
            } else {
                last_data_log_id = last_data_log_id.max(entry.id);
            }
        }

        let id = if config.name.is_empty() {
            config.ip.clone().unwrap_or_else(|| "unknown".to_string())
        } else {
            config.name.clone()
        };

        let node = Arc::new(Self {
            self_ip: RwLock::new(config.ip.clone().unwrap_or_default()),
            id,
            peers: PeerTable::new(),
            kv,
            services,
            election: ElectionState::new(),
            heartbeats: HeartbeatTracker::new(heartbeat_interval()),
            progress: ProgressTracker::new(),
            config_queue: ConfigPushQueue::new(),
            log_store,
            data_snapshot_store: data_store,
            service_snapshot_store: service_store,
            last_service_log_id: std::sync::atomic::AtomicI64::new(last_service_log_id),
            leader_id: RwLock::new(None),
            log_id_gen: RwLock::new(None),
            election_timeout: ElectionTimeoutConfig::default(),
            shutting_down: AtomicBool::new(false),
            config,
        });

        node.election.set_last_log_id(last_data_log_id.max(last_service_log_id));

        // §4.8 config replication: a freshly-started node doesn't know
        // yet whether the cluster's leader has ever seen its config, so
        // it queues its own info for a one-shot, retried-until-acked
        // push (`config_replication_loop`) rather than waiting for the
        // leader to discover it only through the next heartbeat cycle.
        if let Ok(info) = serde_json::to_string(&node.self_info()) {
            node.config_queue.enqueue(info);
        }

        Ok(node)
    }

    pub fn self_ip(&self) -> String {
        self.self_ip.read().clone()
    }

    pub fn set_self_ip(&self, ip: String) {
        *self.self_ip.write() = ip;
    }

    pub fn is_leader(&self) -> bool {
        self.election.role() == RaftRole::Leader
    }

    pub fn leader_id(&self) -> Option<String> {
        self.leader_id.read().clone()
    }

    pub fn set_leader(&self, id: Option<String>) {
        *self.leader_id.write() = id;
    }

    pub fn self_info(&self) -> NodeInfo {
        NodeInfo {
            id: self.id.clone(),
            ip: self.self_ip(),
            group: self.config.group.clone(),
            name: self.config.name.clone(),
            status: Status::Alive,
            role: self.config.role(),
            raft_role: self.election.role(),
            last_log_id: self.election.last_log_id(),
            last_service_log_id: self.last_service_log_id.load(Ordering::SeqCst),
            version: env!("CARGO_PKG_VERSION").to_string(),
            score: self.election.score(),
            score_count: self.election.score_count() as i32,
        }
    }

    pub fn last_service_log_id(&self) -> i64 {
        self.last_service_log_id.load(Ordering::SeqCst)
    }

    /// §3/§7: "clusters with different groups ignore each other" —
    /// a message from a differently-configured group is never a peer
    /// of ours, regardless of what it claims to be.
    pub fn same_group(&self, group: &str) -> bool {
        self.config.group == group
    }

    /// §4.9: peers including self, used when deciding which nodes to
    /// push replication to or compare leadership keys against.
    pub fn all_peers(&self) -> Vec<NodeInfo> {
        let mut all = self.peers.values();
        all.push(self.self_info());
        all
    }

    /// §4.4: mark a peer `Dead` after it has missed three consecutive
    /// heartbeat intervals. Never removes the entry — only rediscovery
    /// (§4.2/§4.9) or a fresh "hi" revives it back to `Alive`.
    pub fn mark_peer_dead(&self, id: &str) {
        if let Some(mut info) = self.peers.get(id) {
            if info.status != Status::Alive {
                return;
            }
            info.status = Status::Dead;
            self.peers.set(id.to_string(), info);
        }
    }

    fn refresh_peer(&self, info: NodeInfo) {
        if info.id == self.id {
            return;
        }
        self.heartbeats.record_seen(&info.id);
        self.peers.set(info.id.clone(), info);
    }

    /// Accept another node's advertised leadership key and step down if
    /// it outranks ours (§4.3/§4.4). Called on every heartbeat/score
    /// exchange, not just during an active election. A message from a
    /// different group is dropped before it can touch any state (§3/§7):
    /// no peer-table update, no liveness record, no leadership
    /// comparison.
    pub fn observe_peer(&self, info: NodeInfo) {
        if !self.same_group(&info.group) {
            return;
        }
        let remote_key = info.leadership_key();
        let local_key = self.election.leadership_key();
        if remote_outranks_local(remote_key, local_key) {
            if self.election.role() == RaftRole::Leader {
                tracing::info!(peer = %info.id, "stepping down: peer outranks local leadership key");
            }
            self.election.set_role(RaftRole::Follower);
            self.set_leader(Some(info.id.clone()));
        }
        self.refresh_peer(info);
    }

    /// Attempt to start an election round (§4.3/§4.4): no-op if the
    /// configured role can't campaign, the current leader is still
    /// alive, or too few peers are known to satisfy `MinNode`. On
    /// success, zeros score/score-count, casts a self-vote, and moves
    /// to `Candidate` — the caller is then responsible for soliciting
    /// `Score` replies from every alive peer and calling
    /// `record_concession`/`finish_candidacy`.
    pub fn begin_candidacy(&self) -> bool {
        if !self.config.role().may_campaign() {
            return false;
        }
        if let Some(leader) = self.leader_id() {
            if leader == self.id || !self.heartbeats.is_dead(&leader) {
                return false;
            }
        }
        if self.peers.alive_count() + 1 < self.config.min_node as usize {
            return false;
        }

        self.election.set_role(RaftRole::Candidate);
        self.election.reset_score_count();
        self.election.set_score(0);
        self.election.increment_score_count();
        true
    }

    pub fn is_candidate(&self) -> bool {
        self.election.role() == RaftRole::Candidate
    }

    /// A peer's `ScoreReply` that didn't carry a dominating leadership
    /// key is a concession (§4.3): score-count +1, score +1. A reply
    /// that *does* dominate is handled by `observe_peer` instead, which
    /// demotes this node to `Follower` before the caller ever reaches
    /// this method — the weight a concession contributes is otherwise
    /// unspecified by spec.md, so a uniform weight of 1 is used.
    pub fn record_concession(&self) {
        self.election.increment_score_count();
        self.election.set_score(self.election.score() + 1);
    }

    /// Conclude a solicitation round (§4.3): if nothing outranked this
    /// node along the way — it would already have been demoted to
    /// `Follower` via `observe_peer` — and its role permits leading,
    /// it becomes `Leader`; otherwise it falls back to `Follower`.
    pub fn finish_candidacy(&self) {
        if !self.is_candidate() {
            return;
        }
        if !self.config.role().may_lead() {
            self.election.set_role(RaftRole::Follower);
            return;
        }

        tracing::info!(node = %self.id, "elected self as leader");
        self.election.set_role(RaftRole::Leader);
        self.set_leader(Some(self.id.clone()));
        *self.log_id_gen.write() = Some(LogIdGenerator::starting_after(self.election.last_log_id()));
    }

    /// Synchronous convenience for a single-node cluster or a test: run
    /// one full election round with no peers to solicit.
    pub fn election_tick(&self) {
        if self.begin_candidacy() {
            self.finish_candidacy();
        }
    }

    pub fn election_timeout_config(&self) -> &ElectionTimeoutConfig {
        &self.election_timeout
    }

    /// Leader-only: assign an id, apply locally, and buffer for flush.
    /// Returns the entry so callers can push it to followers.
    pub fn propose(&self, op: Op) -> Result<LogEntry> {
        if !self.is_leader() {
            return Err(Error::NoLeader);
        }
        let id = {
            let guard = self.log_id_gen.read();
            let gen = guard.as_ref().ok_or(Error::NoLeader)?;
            gen.next_id()
        };
        let entry = LogEntry::new(id, op);
        self.apply_local(&entry);
        Ok(entry)
    }

    fn apply_local(&self, entry: &LogEntry) {
        apply_op_to_state(&self.kv, &self.services, &entry.op);
        if entry.op.is_service_op() {
            self.last_service_log_id.fetch_max(entry.id, Ordering::SeqCst);
        }
        self.election.set_last_log_id(entry.id);
        self.log_store.append(entry.clone());
    }

    /// Follower-side application of a pushed entry (§4.6/§4.8):
    /// idempotent against replays, and flags a gap for catch-up instead
    /// of blocking.
    pub fn apply_remote(&self, entry: LogEntry, from_peer: &str) {
        let current = self.election.last_log_id();
        if !should_apply(entry.id, current) {
            return;
        }
        if needs_catchup_replay(entry.id, current) {
            tracing::warn!(peer = from_peer, from = current, to = entry.id, "gap detected, requesting catch-up");
        }
        self.apply_local(&entry);
    }

    pub fn record_ack(&self, peer_id: &str, log_id: i64) {
        self.progress.record_ack(peer_id, log_id);
    }

    pub fn record_unreachable(&self, peer_id: &str) {
        self.progress.record_unreachable(peer_id);
    }

    pub fn should_push_to(&self, status: Status) -> bool {
        should_replicate_to(status)
    }

    /// Entries applied after `since`, sourced from the log store's
    /// in-memory record rather than the on-disk segments (§4.8/§8
    /// scenario 3/4): a write must be replicable the instant it's
    /// applied, not only after the next flush interval.
    pub fn entries_since(&self, since: i64) -> Result<Vec<LogEntry>> {
        Ok(self.log_store.entries_since(since))
    }

    pub fn flush_log(&self) -> Result<()> {
        self.log_store.flush()
    }

    /// Triggered whenever `LastLogId` advances past what's already
    /// captured — independent of the service snapshot's own trigger
    /// (§4.7/§4.9: the two snapshots are unrelated files with unrelated
    /// watermarks).
    pub fn maybe_snapshot_data(&self, last_saved: &mut i64) -> Result<()> {
        let current = self.election.last_log_id();
        if current > *last_saved {
            let snapshot = DataSnapshot { last_log_id: current, data: self.kv.snapshot() };
            self.data_snapshot_store.save(&snapshot)?;
            *last_saved = current;
        }
        Ok(())
    }

    pub fn maybe_snapshot_services(&self, last_saved: &mut i64) -> Result<()> {
        let current = self.last_service_log_id.load(Ordering::SeqCst);
        if current > *last_saved {
            let snapshot = ServiceSnapshot {
                last_service_log_id: current,
                services: self.services.snapshot(),
            };
            self.service_snapshot_store.save(&snapshot)?;
            *last_saved = current;
        }
        Ok(())
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn shut_down(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }
}

fn apply_op_to_state(kv: &KvStore, services: &ServiceRegistry, op: &Op) {
    match op {
        Op::Set { key, value } => kv.set(key.clone(), value.clone()),
        Op::Remove { key } => kv.remove(key),
        Op::BatchSet { entries } => kv.batch_set(entries.clone()),
        Op::BatchRemove { keys } => kv.batch_remove(keys.iter().cloned()),
        Op::ServiceSet { name, service } => services.set(name.clone(), service.clone()),
        Op::ServiceRemove { name } => services.remove(name),
        Op::PeerUpdate { .. } | Op::ConfigUpdate { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> NodeConfig {
        NodeConfig {
            name: "node-a".to_string(),
            group: "default".to_string(),
            role: Role::AnyRole as i32,
            save_path: dir.path().join("data"),
            log_path: dir.path().join("log"),
            ip: Some("127.0.0.1".to_string()),
            scan: false,
            min_node: 1,
            peers: Vec::new(),
            raft_port: 0,
            repl_port: 0,
        }
    }

    #[test]
    fn bootstraps_with_empty_state() {
        let dir = TempDir::new().unwrap();
        let node = Node::bootstrap(test_config(&dir)).unwrap();
        assert!(!node.is_leader());
        assert_eq!(node.kv.len(), 0);
    }

    #[test]
    fn single_node_cluster_elects_itself() {
        let dir = TempDir::new().unwrap();
        let node = Node::bootstrap(test_config(&dir)).unwrap();
        node.election_tick();
        assert!(node.is_leader());
        assert_eq!(node.leader_id(), Some(node.id.clone()));
    }

    #[test]
    fn never_leader_role_does_not_campaign() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.role = Role::AlwaysFollower as i32;
        let node = Node::bootstrap(config).unwrap();
        node.election_tick();
        assert!(!node.is_leader());
    }

    #[test]
    fn propose_without_leadership_fails() {
        let dir = TempDir::new().unwrap();
        let node = Node::bootstrap(test_config(&dir)).unwrap();
        let result = node.propose(Op::Set { key: "a".into(), value: "1".into() });
        assert!(result.is_err());
    }

    #[test]
    fn propose_after_election_applies_locally() {
        let dir = TempDir::new().unwrap();
        let node = Node::bootstrap(test_config(&dir)).unwrap();
        node.election_tick();
        node.propose(Op::Set { key: "a".into(), value: "1".into() }).unwrap();
        assert_eq!(node.kv.get("a"), Some("1".to_string()));
    }

    #[test]
    fn remote_with_higher_last_log_id_demotes_leader() {
        let dir = TempDir::new().unwrap();
        let node = Node::bootstrap(test_config(&dir)).unwrap();
        node.election_tick();
        assert!(node.is_leader());

        let mut remote = node.self_info();
        remote.id = "node-b".to_string();
        remote.last_log_id = 1000;
        node.observe_peer(remote);

        assert!(!node.is_leader());
        assert_eq!(node.leader_id(), Some("node-b".to_string()));
    }

    #[test]
    fn recovers_data_after_restart() {
        let dir = TempDir::new().unwrap();
        {
            let node = Node::bootstrap(test_config(&dir)).unwrap();
            node.election_tick();
            node.propose(Op::Set { key: "k".into(), value: "v".into() }).unwrap();
            node.flush_log().unwrap();
        }

        let node = Node::bootstrap(test_config(&dir)).unwrap();
        assert_eq!(node.kv.get("k"), Some("v".to_string()));
    }

    #[test]
    fn candidacy_requires_min_node_peers() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.min_node = 2;
        let node = Node::bootstrap(config).unwrap();
        assert!(!node.begin_candidacy());
        assert!(!node.is_leader());
    }

    #[test]
    fn concessions_accumulate_score_and_count() {
        let dir = TempDir::new().unwrap();
        let node = Node::bootstrap(test_config(&dir)).unwrap();
        assert!(node.begin_candidacy());
        node.record_concession();
        node.record_concession();
        // +1 for the self-vote cast in `begin_candidacy`.
        assert_eq!(node.election.score_count(), 3);
        assert_eq!(node.election.score(), 2);
        node.finish_candidacy();
        assert!(node.is_leader());
    }

    #[test]
    fn finish_candidacy_is_a_no_op_once_demoted_mid_round() {
        let dir = TempDir::new().unwrap();
        let node = Node::bootstrap(test_config(&dir)).unwrap();
        assert!(node.begin_candidacy());

        let mut remote = node.self_info();
        remote.id = "node-b".to_string();
        remote.last_log_id = 1000;
        node.observe_peer(remote);
        assert!(!node.is_candidate());

        node.finish_candidacy();
        assert!(!node.is_leader());
        assert_eq!(node.leader_id(), Some("node-b".to_string()));
    }
}
