use parking_lot::Mutex;
use std::time::Duration;

/// A non-leader that learns of a configuration change (e.g. its own
/// `PeerUpdate`) can't log it directly — only the leader assigns log
/// ids. It instead queues the update here and a background task
/// retries pushing it to whichever node is currently leader until the
/// leader acknowledges, at which point it's dropped from the queue.
pub const CONFIG_PUSH_RETRY_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Default)]
pub struct ConfigPushQueue {
    pending: Mutex<Vec<String>>,
}

impl ConfigPushQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, config: String) {
        self.pending.lock().push(config);
    }

    pub fn pending(&self) -> Vec<String> {
        self.pending.lock().clone()
    }

    pub fn acknowledge(&self, config: &str) {
        self.pending.lock().retain(|c| c != config);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledged_entries_are_removed() {
        let queue = ConfigPushQueue::new();
        queue.enqueue("cfg-a".to_string());
        queue.enqueue("cfg-b".to_string());
        queue.acknowledge("cfg-a");
        assert_eq!(queue.pending(), vec!["cfg-b".to_string()]);
    }
}
