//! Engine: one configuration generation bound to the process-wide store.
//!
//! - Compiles the config into the model (fails fast on config errors).
//! - Runs the persistent storage startup protocol.
//! - Prepares one region per counter set. A set whose region cannot be
//!   allocated is unreachable for this generation; the rest keep working.
//!
//! A reload is a new `Engine` built against the same [`ProcessState`].

use std::sync::Arc;

use tally_core::error::Result;
use tally_core::snapshot::Snapshot;

use crate::config::TallyConfig;
use crate::exec::{self, ApplyStats, HostResolver, ValueSource, VarValue};
use crate::model::{self, histogram, CounterSet, Model, Phase, ScopeId, SetId, VarBinding};
use crate::obs;
use crate::persist::{Checkpoint, PersistentStorage};
use crate::state::{now_ms, ProcessState};
use crate::store::{SetStore, SharedRegion};

#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    model: Model,
    stores: Vec<Option<SetStore>>,
    storage: Option<PersistentStorage>,
    checkpoint: Option<Checkpoint>,
    process: Arc<ProcessState>,
}

impl Engine {
    pub fn new(cfg: TallyConfig, process: Arc<ProcessState>) -> Result<Self> {
        let model = model::compile(&cfg)?;

        let storage = cfg
            .persistent_storage
            .as_ref()
            .map(PersistentStorage::from_config)
            .transpose()?;
        let snapshot = match &storage {
            Some(s) => s.recover()?,
            None => Snapshot::empty(),
        };

        process.uptime.mark_reload();

        let mut stores = Vec::with_capacity(model.registry.set_count());
        for (_, set) in model.registry.sets() {
            let zone = process.shm.zone(&set.name, cfg.zone_slots);
            let seeded = zone.init_region(&set.name, set.counters.len(), set.survive_reload, |region| {
                seed_region(set, region, &snapshot)
            });
            match seeded {
                Ok(region) => stores.push(Some(SetStore::new(zone, region))),
                Err(e) => {
                    tracing::error!(set = %set.name, code = e.class().as_str(), "{e}; counter set is unreachable");
                    stores.push(None);
                }
            }
        }

        let checkpoint = storage
            .as_ref()
            .and_then(|s| s.interval)
            .map(|interval| Checkpoint::new(interval, now_ms()));

        tracing::info!(
            sets = model.registry.set_count(),
            scopes = model.scopes.len(),
            persistent = storage.is_some(),
            "engine ready"
        );

        Ok(Self {
            inner: Arc::new(EngineInner { model, stores, storage, checkpoint, process }),
        })
    }

    pub fn model(&self) -> &Model {
        &self.inner.model
    }

    pub fn find_scope(&self, path: &[&str]) -> Option<ScopeId> {
        self.inner.model.find_scope(path)
    }

    /// Storage handle of a set, `None` when unreachable.
    pub fn set_store(&self, set: SetId) -> Option<&SetStore> {
        self.inner.stores.get(set.0).and_then(Option::as_ref)
    }

    /// Apply the scope's ops for `phase`. After a Late pass, writes the
    /// periodic backup when its interval has elapsed.
    pub fn apply<H: HostResolver + ?Sized>(&self, scope: ScopeId, phase: Phase, host: &H) -> ApplyStats {
        let inner = &self.inner;
        let stats = match (inner.model.scope(scope), inner.store_for(scope)) {
            (Some(s), Some(store)) => {
                let values = ScopeValues { engine: inner, scope, host };
                exec::apply(&s.ops, phase, &values, store)
            }
            _ => ApplyStats::default(),
        };

        if phase == Phase::Late {
            inner.maybe_checkpoint();
        }
        stats
    }

    /// Value of any variable as seen from `scope`: engine-computed names
    /// first, then the host.
    pub fn get_var<H: HostResolver + ?Sized>(&self, scope: ScopeId, name: &str, host: &H) -> VarValue {
        ScopeValues { engine: &self.inner, scope, host }.value(name)
    }

    /// Current value of a counter by set and counter name.
    pub fn counter_value(&self, set: &str, counter: &str) -> Option<i64> {
        let reg = &self.inner.model.registry;
        let id = reg.find_set(set)?;
        let idx = reg.set(id).counter_index(counter)?;
        self.set_store(id)?.load(idx)
    }

    /// All reachable sets as a JSON document.
    pub fn collection(&self) -> String {
        self.inner.collection()
    }

    pub fn histogram_collection(&self) -> String {
        obs::render_histograms(&self.inner.model.registry, &self.inner.stores)
    }

    /// Shutdown write of every set to the primary file.
    pub fn flush(&self) -> Result<()> {
        let Some(storage) = &self.inner.storage else {
            return Ok(());
        };
        storage.write_primary(&self.collection())?;
        tracing::info!(path = %storage.path.display(), "persistent counters saved");
        Ok(())
    }

    /// Write the backup now (survive-reload sets only).
    pub fn write_backup(&self) -> Result<()> {
        match &self.inner.storage {
            Some(storage) => storage.write_backup(&self.inner.backup_collection()),
            None => Ok(()),
        }
    }
}

impl EngineInner {
    fn store_for(&self, scope: ScopeId) -> Option<&SetStore> {
        let set = self.model.group_of(scope)?.set?;
        self.stores.get(set.0)?.as_ref()
    }

    fn collection(&self) -> String {
        obs::render_counters(&self.model.registry, &self.stores, |_| true)
    }

    fn backup_collection(&self) -> String {
        obs::render_counters(&self.model.registry, &self.stores, |set| set.survive_reload)
    }

    fn maybe_checkpoint(&self) {
        let (Some(storage), Some(checkpoint)) = (&self.storage, &self.checkpoint) else {
            return;
        };
        if !checkpoint.due(now_ms()) {
            return;
        }
        if let Err(e) = storage.write_backup(&self.backup_collection()) {
            tracing::error!(code = e.class().as_str(), "{e}");
        }
    }
}

/// Seed a fresh region from the snapshot by counter name.
fn seed_region(set: &CounterSet, region: &SharedRegion, snapshot: &Snapshot) {
    let values = match snapshot.values_for(&set.name) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(set = %set.name, code = e.class().as_str(), "{e}; counters start from zero");
            return;
        }
    };
    for (name, value) in values {
        match set.counter_index(&name) {
            Some(idx) => {
                region.store(idx, value);
            }
            None => tracing::debug!(set = %set.name, counter = %name, "stored counter no longer declared"),
        }
    }
}

/// Variable lookup for one scope and one unit of work.
struct ScopeValues<'a, H: ?Sized> {
    engine: &'a EngineInner,
    scope: ScopeId,
    host: &'a H,
}

impl<H: HostResolver + ?Sized> ValueSource for ScopeValues<'_, H> {
    fn value(&self, name: &str) -> VarValue {
        let engine = self.engine;
        match name {
            "cnt_collection" => return VarValue::found(engine.collection()),
            "cnt_uptime" => return VarValue::found(engine.process.uptime.since_start_secs().to_string()),
            "cnt_uptime_reload" => {
                return VarValue::found(engine.process.uptime.since_reload_secs().to_string())
            }
            _ => {}
        }

        let reg = &engine.model.registry;
        let Some(binding) = reg.binding(name) else {
            return self.host.resolve(name);
        };

        let set = engine.model.group_of(self.scope).and_then(|g| g.set);
        let store = engine.store_for(self.scope);

        match binding {
            VarBinding::PlainCounter(entries) => {
                let idx = entries.iter().find(|(s, _)| Some(*s) == set).map(|(_, i)| *i);
                match (idx, store) {
                    (Some(idx), Some(store)) => match store.load(idx) {
                        Some(v) => VarValue::found(v.to_string()),
                        None => self.unreachable(),
                    },
                    _ => self.unreachable(),
                }
            }
            VarBinding::HistogramValue(entries) => {
                let hist = entries.iter().find(|(s, _)| Some(*s) == set).map(|(_, h)| reg.histogram(*h));
                match (hist, store) {
                    (Some(hist), Some(store)) => {
                        let vals: Vec<String> = hist
                            .buckets
                            .iter()
                            .map(|c| store.load(*c).unwrap_or(0).to_string())
                            .collect();
                        VarValue::found(vals.join(","))
                    }
                    _ => VarValue::found(""),
                }
            }
            VarBinding::HistogramBucketGate(entries) => {
                let gate = entries.iter().find(|(s, _, _)| Some(*s) == set);
                let open = match gate {
                    Some((_, h, kind)) => {
                        let hist = reg.histogram(*h);
                        histogram::gate_open(*kind, hist.bins(), &self.value(&hist.bound))
                    }
                    None => false,
                };
                VarValue::found(if open { "1" } else { "0" })
            }
            VarBinding::RangeIndex(id) => {
                let range = reg.range(*id);
                let source = self.value(&range.source);
                if !source.is_usable() {
                    return VarValue::invalid("error");
                }
                match range.classify(&source.text) {
                    c @ model::Classification::Bucket(_) => VarValue::found(c.as_text()),
                    c @ model::Classification::Error => VarValue::invalid(c.as_text()),
                }
            }
        }
    }
}

impl<H: ?Sized> ScopeValues<'_, H> {
    fn unreachable(&self) -> VarValue {
        let mark = self
            .engine
            .model
            .group_of(self.scope)
            .map(|g| g.unreachable_mark.clone())
            .unwrap_or_default();
        VarValue::found(mark)
    }
}
