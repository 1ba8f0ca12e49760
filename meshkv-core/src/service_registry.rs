use dashmap::DashMap;
use std::collections::HashMap;

use crate::service::ServiceDescriptor;

/// The replicated service registry: name → descriptor. Health-check
/// probes (external to the core) feed observations in through
/// `mark_health`; everything else mirrors `KvStore`.
#[derive(Default)]
pub struct ServiceRegistry {
    inner: DashMap<String, ServiceDescriptor>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<ServiceDescriptor> {
        self.inner.get(name).map(|r| r.clone())
    }

    pub fn set(&self, name: String, service: ServiceDescriptor) {
        self.inner.insert(name, service);
    }

    pub fn remove(&self, name: &str) {
        self.inner.remove(name);
    }

    /// Called from the external health-check interface (§1, §6): updates
    /// the liveness flag of an already-registered service without going
    /// through log replication (health is a local observation, not a
    /// replicated mutation, until it is next pushed as a `ServiceSet`).
    pub fn mark_health(&self, name: &str, healthy: bool) {
        if let Some(mut entry) = self.inner.get_mut(name) {
            entry.healthy = healthy;
        }
    }

    pub fn snapshot(&self) -> HashMap<String, ServiceDescriptor> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    pub fn load(&self, entries: HashMap<String, ServiceDescriptor>) {
        self.inner.clear();
        for (k, v) in entries {
            self.inner.insert(k, v);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
