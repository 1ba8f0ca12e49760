use parking_lot::Mutex;
use rand::Rng;

/// Leader-only id generator for log entries (§4.5): `batch * 10_000 +
/// rand(0, 9_999)`. Serialized behind a mutex since the id must be
/// monotonically increasing and collision-free even though the leader
/// accepts proposals from many connections concurrently.
pub struct LogIdGenerator {
    next_batch: Mutex<i64>,
}

impl LogIdGenerator {
    /// `last_log_id` should be the highest id already durable, so a
    /// newly-elected leader doesn't reuse ids a previous leader assigned.
    pub fn starting_after(last_log_id: i64) -> Self {
        let next_batch = if last_log_id < 0 { 0 } else { last_log_id / 10_000 + 1 };
        Self { next_batch: Mutex::new(next_batch) }
    }

    pub fn next_id(&self) -> i64 {
        let mut batch = self.next_batch.lock();
        let id = *batch * 10_000 + rand::thread_rng().gen_range(0..10_000);
        *batch += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing_across_batches() {
        let gen = LogIdGenerator::starting_after(-1);
        let mut prev = gen.next_id();
        for _ in 0..50 {
            let id = gen.next_id();
            assert!(id > prev);
            prev = id;
        }
    }

    #[test]
    fn resumes_after_last_known_log_id() {
        let gen = LogIdGenerator::starting_after(25_500);
        let id = gen.next_id();
        assert!(id >= 26_000);
    }
}
