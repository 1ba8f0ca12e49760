use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A registered service entry in the service registry (§6 service-health
/// probes feed observations in through `mark_health`/`register`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub addr: String,
    pub healthy: bool,
    pub meta: HashMap<String, String>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            healthy: true,
            meta: HashMap::new(),
        }
    }
}
