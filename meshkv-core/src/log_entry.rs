use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::node_info::NodeInfo;
use crate::service::ServiceDescriptor;

/// A replicated mutation. `id` is assigned by the leader (§4.5); `op`
/// carries both the operation tag and its operation-specific payload —
/// on the wire this serializes as the two fields the spec describes
/// (`Op`, `Items`), via serde's adjacently-tagged representation, while
/// staying a single safe Rust enum internally (no (tag, payload) pairs
/// that could disagree).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub op: Op,
}

impl LogEntry {
    pub fn new(id: i64, op: Op) -> Self {
        Self { id, op }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "items")]
pub enum Op {
    Set { key: String, value: String },
    Remove { key: String },
    BatchSet { entries: HashMap<String, String> },
    BatchRemove { keys: HashSet<String> },
    ServiceSet { name: String, service: ServiceDescriptor },
    ServiceRemove { name: String },
    PeerUpdate { info: NodeInfo },
    ConfigUpdate { config: String },
}

impl Op {
    /// Whether this entry mutates the service registry rather than the
    /// `LastLogId`-tracked data map — used to route application and to
    /// decide which `LastXxxLogId` counter an entry advances.
    pub fn is_service_op(&self) -> bool {
        matches!(self, Op::ServiceSet { .. } | Op::ServiceRemove { .. })
    }
}
