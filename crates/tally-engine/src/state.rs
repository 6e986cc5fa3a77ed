//! Process-wide state that outlives configuration generations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::store::SharedMemory;

/// Milliseconds since the Unix epoch (0 if the clock is before it).
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Start time, set once per process, and last (re)configuration time.
#[derive(Debug)]
pub struct Uptime {
    start_ms: u64,
    reload_ms: AtomicU64,
}

impl Uptime {
    pub fn new() -> Self {
        Self::at(now_ms())
    }

    /// Uptime as if the process had started at `start_ms`.
    pub fn at(start_ms: u64) -> Self {
        Self { start_ms, reload_ms: AtomicU64::new(start_ms) }
    }

    pub fn mark_reload(&self) {
        self.mark_reload_at(now_ms());
    }

    pub fn mark_reload_at(&self, at_ms: u64) {
        self.reload_ms.store(at_ms, Ordering::Release);
    }

    pub fn since_start_secs(&self) -> u64 {
        self.since_start_secs_at(now_ms())
    }

    pub fn since_reload_secs(&self) -> u64 {
        self.since_reload_secs_at(now_ms())
    }

    pub fn since_start_secs_at(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms) / 1000
    }

    pub fn since_reload_secs_at(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.reload_ms.load(Ordering::Acquire)) / 1000
    }
}

impl Default for Uptime {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by every engine generation of this process.
#[derive(Debug, Default)]
pub struct ProcessState {
    pub shm: SharedMemory,
    pub uptime: Uptime,
}

impl ProcessState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_resets_only_reload_uptime() {
        let uptime = Uptime::at(1_000_000);
        assert_eq!(uptime.since_start_secs_at(1_090_000), 90);
        assert_eq!(uptime.since_reload_secs_at(1_090_000), 90);

        uptime.mark_reload_at(1_060_000);
        assert_eq!(uptime.since_start_secs_at(1_090_000), 90);
        assert_eq!(uptime.since_reload_secs_at(1_090_000), 30);
    }

    #[test]
    fn clock_before_mark_reads_zero() {
        let uptime = Uptime::at(5_000);
        assert_eq!(uptime.since_start_secs_at(1_000), 0);
    }
}
