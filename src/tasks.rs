use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;

use meshkv_consensus::heartbeat_interval;
use meshkv_core::{NodeInfo, Status};
use meshkv_protocol::{read_msg, write_msg, Head, Msg, DEFAULT_DIAL_TIMEOUT};
use meshkv_replication::CONFIG_PUSH_RETRY_INTERVAL;

use crate::node::Node;

async fn send_and_recv(addr: &str, msg: &Msg) -> Option<Msg> {
    let mut stream = tokio::time::timeout(DEFAULT_DIAL_TIMEOUT, TcpStream::connect(addr))
        .await
        .ok()?
        .ok()?;
    write_msg(&mut stream, msg).await.ok()?;
    read_msg(&mut stream).await.ok().flatten()
}

/// Drives the election-timeout check and, on expiry, a full
/// solicitation round (§4.3/§4.4): become candidate, ask every alive
/// peer for its score, tally concessions, and conclude. Runs at a finer
/// grain than the election timeout itself so a randomized jittered
/// timeout can expire promptly.
pub async fn election_loop(node: Arc<Node>) {
    loop {
        if node.is_shutting_down() {
            return;
        }
        let timeout = node.election_timeout_config().generate_timeout();
        tokio::time::sleep(timeout).await;

        if !node.begin_candidacy() {
            continue;
        }

        for peer in node.peers.values() {
            if peer.status != Status::Alive {
                continue;
            }
            if !node.is_candidate() {
                // Demoted mid-round by an earlier reply's dominating key.
                break;
            }
            let addr = format!("{}:{}", peer.ip, node.config.raft_port);
            let msg = Msg::empty(Head::Score, node.self_info());
            if let Some(reply) = send_and_recv(&addr, &msg).await {
                node.observe_peer(reply.info);
                if node.is_candidate() {
                    node.record_concession();
                }
            }
        }

        node.finish_candidacy();
    }
}

/// Leader-only heartbeat broadcast; followers rely on `observe_peer`
/// (driven by inbound connections) rather than polling here (§4.4).
pub async fn heartbeat_loop(node: Arc<Node>) {
    loop {
        if node.is_shutting_down() {
            return;
        }
        tokio::time::sleep(heartbeat_interval()).await;
        if !node.is_leader() {
            continue;
        }
        for peer in node.peers.values() {
            if peer.status != Status::Alive {
                continue;
            }
            let addr = format!("{}:{}", peer.ip, node.config.raft_port);
            let msg = Msg::empty(Head::Heartbeat, node.self_info());
            match send_and_recv(&addr, &msg).await {
                Some(reply) => node.observe_peer(reply.info),
                None if node.heartbeats.is_dead(&peer.id) => node.mark_peer_dead(&peer.id),
                None => {}
            }
        }
    }
}

/// Leader-only best-effort push of newly-applied entries to every alive
/// peer (§4.8). No quorum wait: a peer that doesn't ack is flagged for
/// catch-up and otherwise ignored until it reappears.
pub async fn replication_loop(node: Arc<Node>) {
    let mut last_pushed = node.election.last_log_id();
    loop {
        if node.is_shutting_down() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        if !node.is_leader() {
            continue;
        }
        let current = node.election.last_log_id();
        if current <= last_pushed {
            continue;
        }
        let Ok(entries) = node.entries_since(last_pushed) else { continue };

        for peer in node.peers.values() {
            if !node.should_push_to(peer.status) {
                continue;
            }
            push_entries_to_peer(&node, &peer, &entries).await;
        }
        last_pushed = current;
    }
}

async fn push_entries_to_peer(node: &Arc<Node>, peer: &NodeInfo, entries: &[meshkv_core::LogEntry]) {
    let addr = format!("{}:{}", peer.ip, node.config.repl_port);
    let mut acked = node.progress.acked_log_id(&peer.id).unwrap_or(-1);
    for entry in entries {
        if entry.id <= acked {
            continue;
        }
        let Some(msg) = Msg::with_body(Head::ReplLogEntry, entry, node.self_info()) else { continue };
        match send_and_recv(&addr, &msg).await {
            Some(_) => {
                acked = entry.id;
                node.record_ack(&peer.id, entry.id);
            }
            None => {
                node.record_unreachable(&peer.id);
                return;
            }
        }
    }
}

/// Periodic flush of the in-memory log tail to disk (§4.6).
pub async fn log_flush_loop(node: Arc<Node>) {
    loop {
        if node.is_shutting_down() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        if let Err(e) = node.flush_log() {
            tracing::error!(error = %e, "log flush failed");
        }
    }
}

/// Periodic data/service snapshot compaction, each on its own watermark
/// (§4.7/§4.9).
pub async fn snapshot_loop(node: Arc<Node>) {
    let mut last_data_saved = -1i64;
    let mut last_service_saved = -1i64;
    loop {
        if node.is_shutting_down() {
            return;
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        if let Err(e) = node.maybe_snapshot_data(&mut last_data_saved) {
            tracing::error!(error = %e, "data snapshot failed");
        }
        if let Err(e) = node.maybe_snapshot_services(&mut last_service_saved) {
            tracing::error!(error = %e, "service snapshot failed");
        }
    }
}

/// A non-leader retries pushing its queued local config changes (e.g.
/// its own freshly-learned `PeerUpdate`) to the leader every 100ms
/// until acknowledged (§9 supplement, grounded in the original's
/// config-replication retry behavior).
pub async fn config_replication_loop(node: Arc<Node>) {
    loop {
        if node.is_shutting_down() {
            return;
        }
        tokio::time::sleep(CONFIG_PUSH_RETRY_INTERVAL).await;
        if node.is_leader() || node.config_queue.is_empty() {
            continue;
        }
        let Some(leader_id) = node.leader_id() else { continue };
        let Some(leader) = node.peers.get(&leader_id) else { continue };
        let addr = format!("{}:{}", leader.ip, node.config.repl_port);

        for config in node.config_queue.pending() {
            let Some(info) = serde_json::from_str::<NodeInfo>(&config).ok() else { continue };
            let Some(msg) = Msg::with_body(Head::ReplReconfigFromFollower, &info, node.self_info()) else {
                continue;
            };
            if send_and_recv(&addr, &msg).await.is_some() {
                node.config_queue.acknowledge(&config);
            }
        }
    }
}

