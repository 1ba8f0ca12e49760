//! meshkv-core - Fundamental data model for the clustered key/value and
//! service-registry daemon: node identity, the replicated log entry shape,
//! and the concurrent containers that the consensus, replication, and
//! storage crates all build on.

pub mod error;
pub mod kv_store;
pub mod log_entry;
pub mod node_info;
pub mod peer_table;
pub mod service;
pub mod service_registry;

pub use error::{Error, Result};
pub use kv_store::KvStore;
pub use log_entry::{LogEntry, Op};
pub use node_info::{NodeInfo, PeerInfo, RaftRole, Role, Status};
pub use peer_table::PeerTable;
pub use service::ServiceDescriptor;
pub use service_registry::ServiceRegistry;

