use std::sync::Arc;

use meshkv::config::NodeConfig;
use meshkv::discovery;
use meshkv::node::Node;
use meshkv::server::Server;
use meshkv::tasks;

/// Minimal `--flag value` parsing, in keeping with the rest of the
/// config layer: everything can also come from a config file via
/// `--config`, CLI flags just override individual fields.
fn parse_args() -> (Option<String>, Option<String>, Option<String>) {
    let mut config_path = None;
    let mut name = None;
    let mut peers = None;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                config_path = Some(args[i + 1].clone());
                i += 2;
            }
            "--name" if i + 1 < args.len() => {
                name = Some(args[i + 1].clone());
                i += 2;
            }
            "--peers" if i + 1 < args.len() => {
                peers = Some(args[i + 1].clone());
                i += 2;
            }
            _ => i += 1,
        }
    }
    (config_path, name, peers)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).with_level(true).init();

    let (config_path, name, peers) = parse_args();
    let mut config = match config_path {
        Some(path) => NodeConfig::from_file(&path)?,
        None => NodeConfig::default(),
    };
    if let Some(name) = name {
        config.name = name;
    }
    if let Some(peers) = peers {
        config.peers = peers.split(',').map(str::trim).map(str::to_string).collect();
    }
    config.validate()?;

    let node = Node::bootstrap(config)?;
    if let Some(ip) = local_ip() {
        node.set_self_ip(ip);
    }

    tracing::info!(
        id = %node.id,
        role = ?node.config.role(),
        name = %node.config.name,
        group = %node.config.group,
        log_path = %node.config.log_path.display(),
        save_path = %node.config.save_path.display(),
        min_node = node.config.min_node,
        last_log_id = node.election.last_log_id(),
        last_service_log_id = node.last_service_log_id(),
        "starting meshkv node"
    );

    tokio::spawn(discovery::run(Arc::clone(&node)));
    tokio::spawn(tasks::election_loop(Arc::clone(&node)));
    tokio::spawn(tasks::heartbeat_loop(Arc::clone(&node)));
    tokio::spawn(tasks::replication_loop(Arc::clone(&node)));
    tokio::spawn(tasks::log_flush_loop(Arc::clone(&node)));
    tokio::spawn(tasks::snapshot_loop(Arc::clone(&node)));
    tokio::spawn(tasks::config_replication_loop(Arc::clone(&node)));

    let server = Arc::new(Server::new(node));
    server.run().await?;

    Ok(())
}

fn local_ip() -> Option<String> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}
