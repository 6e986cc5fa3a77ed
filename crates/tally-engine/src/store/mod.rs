//! Shared counter storage.
//!
//! - [`SharedMemory`]: process-wide zone table, outlives engine generations.
//! - [`SharedZone`]: one per counter set; owns the current region.
//! - [`SharedRegion`]: the atomic slots workers update.

pub mod region;
pub mod zone;

use std::sync::Arc;

use dashmap::DashMap;

use crate::model::CounterId;

pub use region::SharedRegion;
pub use zone::SharedZone;

const ZONE_PREFIX: &str = "counters_";

/// Zone table keyed by zone name.
#[derive(Debug, Default)]
pub struct SharedMemory {
    zones: DashMap<String, Arc<SharedZone>>,
}

impl SharedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zone of counter set `set`, created with `capacity` slots on first use.
    /// An existing zone keeps its original capacity.
    pub fn zone(&self, set: &str, capacity: usize) -> Arc<SharedZone> {
        let name = format!("{ZONE_PREFIX}{set}");
        let zone = self
            .zones
            .entry(name.clone())
            .or_insert_with(|| Arc::new(SharedZone::new(name, capacity)));
        Arc::clone(zone.value())
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }
}

/// Storage handle of one counter set for one engine generation.
#[derive(Debug, Clone)]
pub struct SetStore {
    zone: Arc<SharedZone>,
    region: Arc<SharedRegion>,
}

impl SetStore {
    pub fn new(zone: Arc<SharedZone>, region: Arc<SharedRegion>) -> Self {
        Self { zone, region }
    }

    pub fn load(&self, idx: CounterId) -> Option<i64> {
        self.region.load(idx)
    }

    pub fn increment(&self, idx: CounterId, delta: i64) -> bool {
        self.region.fetch_add(idx, delta)
    }

    pub fn set(&self, idx: CounterId, value: i64) -> bool {
        self.zone.set(&self.region, idx, value)
    }

    pub fn values(&self) -> Vec<i64> {
        self.region.values()
    }

    pub fn region(&self) -> &Arc<SharedRegion> {
        &self.region
    }

    /// False once a later generation replaced this handle's region.
    pub fn is_current(&self) -> bool {
        self.zone.current().is_some_and(|r| Arc::ptr_eq(&r, &self.region))
    }
}
