use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use meshkv_core::{Error, LogEntry, NodeInfo, Op, Result};
use meshkv_protocol::{read_msg_untimed, write_msg, Head, Msg};

use crate::node::Node;

/// Owns the two listeners the spec calls out (§6): the raft port
/// (discovery/heartbeat/score exchange) and the repl port (log entry
/// push, catch-up, follower config forwarding). Also the thin admin
/// façade boundary — everything an external HTTP layer would need, with
/// HTTP itself left out of scope.
pub struct Server {
    node: Arc<Node>,
}

impl Server {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let raft_addr = format!("0.0.0.0:{}", self.node.config.raft_port);
        let repl_addr = format!("0.0.0.0:{}", self.node.config.repl_port);

        let raft_listener = TcpListener::bind(&raft_addr).await?;
        let repl_listener = TcpListener::bind(&repl_addr).await?;
        tracing::info!(raft = %raft_addr, repl = %repl_addr, "listening");

        let raft_server = Arc::clone(&self);
        let raft_task = tokio::spawn(async move { raft_server.accept_loop(raft_listener, true).await });

        let repl_server = Arc::clone(&self);
        let repl_task = tokio::spawn(async move { repl_server.accept_loop(repl_listener, false).await });

        let _ = tokio::join!(raft_task, repl_task);
        Ok(())
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener, is_raft_port: bool) {
        loop {
            match listener.accept().await {
                Ok((socket, addr)) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(socket, is_raft_port).await {
                            tracing::debug!(peer = %addr, error = %e, "connection closed with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }

    async fn handle_connection(&self, mut socket: TcpStream, is_raft_port: bool) -> anyhow::Result<()> {
        let Some(msg) = read_msg_untimed(&mut socket).await? else {
            return Ok(());
        };

        // §3/§7: a message from a different group is a protocol
        // violation, not a peer — drop it before any handler can touch
        // state, and send no reply.
        if !self.node.same_group(&msg.info.group) {
            tracing::debug!(peer = %msg.info.id, group = %msg.info.group, "dropping message: group mismatch");
            return Ok(());
        }

        let reply = if is_raft_port {
            self.handle_raft_message(msg)
        } else {
            self.handle_repl_message(msg)
        };

        if let Some(reply) = reply {
            write_msg(&mut socket, &reply).await?;
        }
        Ok(())
    }

    fn handle_raft_message(&self, msg: Msg) -> Option<Msg> {
        self.node.observe_peer(msg.info.clone());

        match msg.head {
            Head::Hi => Some(Msg::empty(Head::Hi2, self.node.self_info())),
            Head::Heartbeat => {
                self.node.heartbeats.record_seen(&msg.info.id);
                Some(Msg::empty(Head::HeartbeatReply, self.node.self_info()))
            }
            Head::Score => Some(Msg::empty(Head::ScoreReply, self.node.self_info())),
            _ => None,
        }
    }

    fn handle_repl_message(&self, msg: Msg) -> Option<Msg> {
        match msg.head {
            Head::ReplLogEntry => {
                if let Some(entry) = msg.decode_body::<LogEntry>() {
                    self.node.apply_remote(entry, &msg.info.id);
                }
                Some(Msg::empty(Head::ReplResponse, self.node.self_info()))
            }
            Head::ReplCatchupRequest => {
                let since = msg.decode_body::<i64>().unwrap_or(-1);
                let entries = self.node.entries_since(since).unwrap_or_default();
                Msg::with_body(Head::ReplCatchupResponse, &entries, self.node.self_info())
            }
            Head::ReplReconfigFromFollower => {
                if self.node.is_leader() {
                    if let Some(info) = msg.decode_body::<NodeInfo>() {
                        let _ = self.node.propose(Op::PeerUpdate { info });
                    }
                }
                Some(Msg::empty(Head::ReplResponse, self.node.self_info()))
            }
            _ => None,
        }
    }

    // --- Admin façade boundary (§6): the only surface an external HTTP
    // layer is expected to call through. ---

    pub fn node_info(&self) -> NodeInfo {
        self.node.self_info()
    }

    pub fn is_leader(&self) -> bool {
        self.node.is_leader()
    }

    pub fn propose(&self, op: Op) -> Result<LogEntry> {
        self.node.propose(op)
    }

    /// Returns the id of the node that should receive a write this node
    /// can't satisfy locally, so the caller (the admin façade itself)
    /// can forward the request on.
    pub fn forward_to_leader(&self) -> Result<String> {
        self.node.leader_id().ok_or(Error::NoLeader)
    }
}
