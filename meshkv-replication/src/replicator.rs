use meshkv_core::Status;

/// Whether the leader should push to this peer at all. Dead peers are
/// skipped rather than retried — they're picked up by the discovery
/// sweep once they reappear (§4.2/§4.8).
pub fn should_replicate_to(peer_status: Status) -> bool {
    matches!(peer_status, Status::Alive)
}

/// A follower applies an incoming entry only if it's actually new.
/// Replays during catch-up, or a duplicate push racing a dropped
/// connection, are silently discarded rather than treated as an error
/// (§4.6: idempotent application keyed on `LogEntry.id`).
pub fn should_apply(incoming_id: i64, current_last_log_id: i64) -> bool {
    incoming_id > current_last_log_id
}

/// A follower that receives an entry more than one id ahead of what it
/// has has missed something — best-effort replication doesn't retry a
/// drop, so the gap is only closed by an explicit catch-up request
/// (§4.8/§4.9).
pub fn needs_catchup_replay(incoming_id: i64, current_last_log_id: i64) -> bool {
    incoming_id > current_last_log_id + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_peers_are_skipped() {
        assert!(!should_replicate_to(Status::Dead));
        assert!(should_replicate_to(Status::Alive));
    }

    #[test]
    fn duplicate_entries_are_not_reapplied() {
        assert!(!should_apply(5, 5));
        assert!(!should_apply(4, 5));
        assert!(should_apply(6, 5));
    }

    #[test]
    fn gap_larger_than_one_triggers_catchup() {
        assert!(!needs_catchup_replay(6, 5));
        assert!(needs_catchup_replay(8, 5));
    }
}
