use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use tokio::net::TcpStream;

use meshkv_protocol::{read_msg, write_msg, Head, Msg, DEFAULT_DIAL_TIMEOUT};

use crate::node::Node;

/// Say "hi" to one address on the raft port: establishes mutual
/// awareness only — who should lead is decided later, by the heartbeat
/// and election loop, never by discovery itself (mirrors the
/// original's separation between `sayHi` and leader comparison).
pub async fn say_hi(node: &Arc<Node>, ip: &str) -> bool {
    if ip == node.self_ip() {
        return false;
    }
    let addr = format!("{ip}:{}", node.config.raft_port);

    let stream = match tokio::time::timeout(DEFAULT_DIAL_TIMEOUT, TcpStream::connect(&addr)).await
    {
        Ok(Ok(s)) => s,
        _ => return false,
    };

    if is_self_connection(&stream) {
        node.peers.remove(ip);
        return false;
    }

    let mut stream = stream;
    let hi = Msg::empty(Head::Hi, node.self_info());
    if write_msg(&mut stream, &hi).await.is_err() {
        return false;
    }

    match read_msg(&mut stream).await {
        Ok(Some(reply)) if matches!(reply.head, Head::Hi2) => {
            node.observe_peer(reply.info);
            true
        }
        _ => false,
    }
}

/// A connection is "to ourselves" when the OS routed it back to our own
/// socket — the standard way of catching a seed/scan address that
/// happens to resolve to the local host (§4.2).
fn is_self_connection(stream: &TcpStream) -> bool {
    match (stream.local_addr(), stream.peer_addr()) {
        (Ok(local), Ok(peer)) => local.ip() == peer.ip(),
        _ => false,
    }
}

/// Discover every host alive on the local /24 by saying hi to each
/// address in parallel (§4.2). Best-effort: an address that refuses
/// the connection or times out is simply not a peer.
pub async fn scan_local_lan(node: Arc<Node>) {
    let Some(local_ip) = local_ipv4() else {
        tracing::warn!("could not determine local IPv4 address, skipping LAN scan");
        return;
    };
    let octets = local_ip.octets();
    let segment = format!("{}.{}.{}", octets[0], octets[1], octets[2]);

    let mut tasks = Vec::new();
    for i in 1u16..256 {
        let ip = format!("{segment}.{i}");
        let node = Arc::clone(&node);
        tasks.push(tokio::spawn(async move {
            if say_hi(&node, &ip).await {
                tracing::debug!(ip = %ip, "discovered peer on local lan");
            }
        }));
    }
    for task in tasks {
        let _ = task.await;
    }
}

/// Say hi to every explicitly configured seed peer (§6's Peers config).
pub async fn say_hi_to_seeds(node: Arc<Node>) {
    for peer in node.config.peers.clone() {
        let node = Arc::clone(&node);
        tokio::spawn(async move {
            say_hi(&node, &peer).await;
        });
    }
}

fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(_) => None,
    }
}

/// Run discovery once at startup (§4.9): seed peers and, if configured,
/// the local /24 LAN sweep. A node that joins after this has run is
/// picked up only once it says "hi" to us first, or once it's added to
/// the seed list and the process restarts — there is no ongoing rescan.
pub async fn run(node: Arc<Node>) {
    say_hi_to_seeds(Arc::clone(&node)).await;
    if node.config.scan {
        scan_local_lan(node).await;
    }
}

