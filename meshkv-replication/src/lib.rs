//! meshkv-replication - Best-effort, non-quorum-blocking replication
//! (§4.8): the leader pushes to every peer it believes is alive and
//! applies locally regardless of whether followers ack, flagging
//! unreachable ones for catch-up instead of retrying inline.

pub mod config_replication;
pub mod progress;
pub mod replicator;

pub use config_replication::{ConfigPushQueue, CONFIG_PUSH_RETRY_INTERVAL};
pub use progress::ProgressTracker;
pub use replicator::{needs_catchup_replay, should_apply, should_replicate_to};

