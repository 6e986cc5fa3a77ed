use std::sync::{Arc, Mutex};

use tally_core::error::{Result, TallyError};

use super::region::SharedRegion;
use crate::model::CounterId;

/// Named zone backing one counter set across configuration generations.
///
/// The zone owns the current region and a slot budget. Regions are handed to
/// workers as `Arc`s; a region replaced on reload stays alive for workers that
/// still hold it, but their writes no longer reach the zone.
#[derive(Debug)]
pub struct SharedZone {
    name: String,
    capacity: usize,
    state: Mutex<ZoneState>,
}

#[derive(Debug, Default)]
struct ZoneState {
    region: Option<Arc<SharedRegion>>,
    used: usize,
}

impl SharedZone {
    pub(crate) fn new(name: String, capacity: usize) -> Self {
        Self { name, capacity, state: Mutex::new(ZoneState::default()) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current(&self) -> Option<Arc<SharedRegion>> {
        self.state.lock().ok().and_then(|s| s.region.clone())
    }

    /// Prepare the region for a set of `n` counters.
    ///
    /// - survives reload and has the same size: kept as is;
    /// - not larger than the current one: zeroed in place;
    /// - larger: a new region is allocated, the old values are copied over
    ///   and the old region is retired;
    /// - first initialization: `seed` fills the fresh region.
    pub fn init_region(
        &self,
        set: &str,
        n: usize,
        survive: bool,
        seed: impl FnOnce(&SharedRegion),
    ) -> Result<Arc<SharedRegion>> {
        let mut state = self.state.lock().map_err(|_| TallyError::Storage {
            set: set.to_string(),
            reason: "zone mutex poisoned".into(),
        })?;

        let Some(old) = state.region.clone() else {
            let region = self.allocate(&mut state, set, n)?;
            seed(&region);
            state.region = Some(Arc::clone(&region));
            return Ok(region);
        };

        let m = old.live();
        if survive {
            if n == m {
                tracing::debug!(set = %set, counters = n, "counters survive reload");
                return Ok(old);
            }
            tracing::warn!(
                set = %set, old = m, new = n,
                "number of counters changed, counters will not survive reload"
            );
        }

        if n <= m {
            old.reset(n);
            return Ok(old);
        }

        let region = self.allocate(&mut state, set, n)?;
        region.copy_from(&old, m);
        state.used = state.used.saturating_sub(old.slot_count());
        state.region = Some(Arc::clone(&region));
        tracing::debug!(set = %set, old = m, new = n, "region grown");
        Ok(region)
    }

    /// Store under the zone mutex. Returns false when the mutex is poisoned.
    pub fn set(&self, region: &SharedRegion, idx: CounterId, value: i64) -> bool {
        match self.state.lock() {
            Ok(_guard) => region.store(idx, value),
            Err(_) => false,
        }
    }

    fn allocate(&self, state: &mut ZoneState, set: &str, n: usize) -> Result<Arc<SharedRegion>> {
        let needed = n + 1;
        if state.used + needed > self.capacity {
            return Err(TallyError::Storage {
                set: set.to_string(),
                reason: format!(
                    "zone \"{}\" cannot hold {n} counters ({} of {} slots in use)",
                    self.name, state.used, self.capacity
                ),
            });
        }
        state.used += needed;
        Ok(Arc::new(SharedRegion::new(n)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn first_init_runs_seed_once() {
        let zone = SharedZone::new("z".into(), 16);
        let r = zone
            .init_region("s", 2, false, |r| {
                r.store(CounterId(1), 9);
            })
            .unwrap();
        assert_eq!(r.values(), vec![0, 9]);

        let again = zone.init_region("s", 2, true, |_| panic!("seed on reload")).unwrap();
        assert!(Arc::ptr_eq(&r, &again));
    }

    #[test]
    fn capacity_is_enforced() {
        let zone = SharedZone::new("z".into(), 4);
        let err = zone.init_region("s", 4, false, |_| {}).unwrap_err();
        assert_eq!(err.class().as_str(), "STORAGE");
        assert!(zone.current().is_none());
    }
}
