use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Periodic backup trigger shared by all workers.
///
/// At most one caller wins each interval; the others see `false`.
#[derive(Debug)]
pub struct Checkpoint {
    interval_ms: u64,
    last_ms: AtomicU64,
}

impl Checkpoint {
    pub fn new(interval: Duration, now_ms: u64) -> Self {
        Self {
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            last_ms: AtomicU64::new(now_ms),
        }
    }

    /// True when more than one interval has passed since the last checkpoint;
    /// the winner records `now_ms` as the new checkpoint time.
    pub fn due(&self, now_ms: u64) -> bool {
        let last = self.last_ms.load(Ordering::Acquire);
        if now_ms.saturating_sub(last) <= self.interval_ms {
            return false;
        }
        self.last_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
