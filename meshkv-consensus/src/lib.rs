//! meshkv-consensus - Score-based leader election (§4.3/§4.4): each node
//! tracks its own leadership key and compares it against every peer it
//! hears from, with no separate term/vote bookkeeping.

pub mod election;
pub mod heartbeat;
pub mod log_id;
pub mod state;

pub use election::{heartbeat_interval, ElectionTimeoutConfig, HEARTBEAT_INTERVAL_MS};
pub use heartbeat::{HeartbeatTracker, MISSED_HEARTBEATS_BEFORE_DEAD};
pub use log_id::LogIdGenerator;
pub use state::{remote_outranks_local, ElectionState, LeadershipKey};

