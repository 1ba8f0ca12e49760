use dashmap::DashMap;
use std::collections::HashMap;

/// The replicated key/value map. A thread-safe container in its own
/// right, mutated only through applied `LogEntry` operations.
#[derive(Default)]
pub struct KvStore {
    inner: DashMap<String, String>,
}

impl KvStore {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.clone())
    }

    pub fn set(&self, key: String, value: String) {
        self.inner.insert(key, value);
    }

    pub fn remove(&self, key: &str) {
        self.inner.remove(key);
    }

    pub fn batch_set(&self, entries: HashMap<String, String>) {
        for (k, v) in entries {
            self.inner.insert(k, v);
        }
    }

    pub fn batch_remove(&self, keys: impl IntoIterator<Item = String>) {
        for k in keys {
            self.inner.remove(&k);
        }
    }

    /// A point-in-time copy, used to build the data snapshot.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    /// Replace the entire map, used when restoring from a snapshot.
    pub fn load(&self, entries: HashMap<String, String>) {
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
