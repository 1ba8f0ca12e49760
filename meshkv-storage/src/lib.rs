//! meshkv-storage - On-disk persistence: the append-only log store and
//! the data/service state snapshots it's periodically compacted into.

pub mod log_store;
pub mod segment;
pub mod state_store;

pub use log_store::LogStore;
pub use segment::Segment;
pub use state_store::{Compress, StateStore};

