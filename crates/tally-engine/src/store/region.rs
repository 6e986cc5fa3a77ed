use std::sync::atomic::{AtomicI64, Ordering};

use crate::model::CounterId;

/// Fixed-size array of atomic counters. Slot 0 holds the number of live
/// counters; counter `i` lives in slot `i + 1`.
#[derive(Debug)]
pub struct SharedRegion {
    slots: Box<[AtomicI64]>,
}

impl SharedRegion {
    pub(crate) fn new(live: usize) -> Self {
        let slots: Box<[AtomicI64]> = (0..=live).map(|_| AtomicI64::new(0)).collect();
        slots[0].store(live as i64, Ordering::Release);
        Self { slots }
    }

    /// Slots including the header.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn live(&self) -> usize {
        usize::try_from(self.slots[0].load(Ordering::Acquire)).unwrap_or(0)
    }

    pub fn load(&self, idx: CounterId) -> Option<i64> {
        self.slots.get(idx.0 + 1).map(|s| s.load(Ordering::Relaxed))
    }

    /// Wrapping add; no overflow detection.
    pub fn fetch_add(&self, idx: CounterId, delta: i64) -> bool {
        match self.slots.get(idx.0 + 1) {
            Some(slot) => {
                slot.fetch_add(delta, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Plain store; callers hold the zone mutex.
    pub(crate) fn store(&self, idx: CounterId, value: i64) -> bool {
        match self.slots.get(idx.0 + 1) {
            Some(slot) => {
                slot.store(value, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Zero every counter and declare `live` of them in use.
    pub(crate) fn reset(&self, live: usize) {
        for slot in &self.slots[1..] {
            slot.store(0, Ordering::Relaxed);
        }
        self.slots[0].store(live as i64, Ordering::Release);
    }

    /// Copy the first `n` counters of `other`.
    pub(crate) fn copy_from(&self, other: &SharedRegion, n: usize) {
        for (dst, src) in self.slots[1..].iter().zip(&other.slots[1..]).take(n) {
            dst.store(src.load(Ordering::Relaxed), Ordering::Relaxed);
        }
    }

    /// Values of the live counters, in index order.
    pub fn values(&self) -> Vec<i64> {
        let live = self.live().min(self.slots.len() - 1);
        self.slots[1..=live].iter().map(|s| s.load(Ordering::Relaxed)).collect()
    }
}
