//! Counter sets and variable bindings.
//!
//! Every counter, histogram and range index is addressed by a typed id into
//! an arena owned by [`Registry`]. Variable names resolve to a
//! [`VarBinding`] fixed at declaration time; one name may be declared in
//! several sets, but always with the same kind.

use std::collections::HashMap;

use tally_core::error::{Result, TallyError};

use super::histogram::{GateKind, HistogramDef, HistogramId};
use super::ops::CounterId;
use super::range::{RangeId, RangeIndex};

/// Variables computed by the engine itself; never declarable.
pub const RESERVED_VARS: [&str; 3] = ["cnt_collection", "cnt_uptime", "cnt_uptime_reload"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(pub usize);

#[derive(Debug, Clone)]
pub struct CounterSet {
    pub name: String,
    /// Counter names in index order.
    pub counters: Vec<String>,
    pub histograms: Vec<HistogramId>,
    pub survive_reload: bool,
}

impl CounterSet {
    pub fn counter_index(&self, name: &str) -> Option<CounterId> {
        self.counters.iter().position(|c| c == name).map(CounterId)
    }
}

/// What a variable name means, per set where it was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarBinding {
    PlainCounter(Vec<(SetId, CounterId)>),
    HistogramValue(Vec<(SetId, HistogramId)>),
    HistogramBucketGate(Vec<(SetId, HistogramId, GateKind)>),
    RangeIndex(RangeId),
}

impl VarBinding {
    fn kind(&self) -> &'static str {
        match self {
            VarBinding::PlainCounter(_) => "counter",
            VarBinding::HistogramValue(_) => "histogram",
            VarBinding::HistogramBucketGate(_) => "histogram gate",
            VarBinding::RangeIndex(_) => "range index",
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    sets: Vec<CounterSet>,
    set_index: HashMap<String, SetId>,
    bindings: HashMap<String, VarBinding>,
    histograms: Vec<HistogramDef>,
    ranges: Vec<RangeIndex>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sets(&self) -> impl Iterator<Item = (SetId, &CounterSet)> {
        self.sets.iter().enumerate().map(|(i, s)| (SetId(i), s))
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn set(&self, id: SetId) -> &CounterSet {
        &self.sets[id.0]
    }

    pub fn find_set(&self, name: &str) -> Option<SetId> {
        self.set_index.get(name).copied()
    }

    /// Set named `name`, created on first use.
    pub fn resolve_set(&mut self, name: &str) -> SetId {
        if let Some(id) = self.set_index.get(name) {
            return *id;
        }
        let id = SetId(self.sets.len());
        self.sets.push(CounterSet {
            name: name.to_string(),
            counters: Vec::new(),
            histograms: Vec::new(),
            survive_reload: false,
        });
        self.set_index.insert(name.to_string(), id);
        id
    }

    pub fn mark_survive(&mut self, set: SetId) {
        self.sets[set.0].survive_reload = true;
    }

    /// Index of counter `name` in `set`, allocating the next index on first
    /// declaration.
    pub fn intern_counter(&mut self, set: SetId, name: &str) -> Result<CounterId> {
        self.check_kind(name, "counter")?;

        let counters = &mut self.sets[set.0].counters;
        let idx = match counters.iter().position(|c| c == name) {
            Some(i) => CounterId(i),
            None => {
                counters.push(name.to_string());
                CounterId(counters.len() - 1)
            }
        };

        let binding = self
            .bindings
            .entry(name.to_string())
            .or_insert_with(|| VarBinding::PlainCounter(Vec::new()));
        if let VarBinding::PlainCounter(entries) = binding {
            if !entries.contains(&(set, idx)) {
                entries.push((set, idx));
            }
        }
        Ok(idx)
    }

    pub fn push_histogram(&mut self, def: HistogramDef) -> Result<HistogramId> {
        self.check_kind(&def.name, "histogram")?;
        let id = HistogramId(self.histograms.len());
        let set = def.set;
        let name = def.name.clone();
        self.histograms.push(def);
        self.sets[set.0].histograms.push(id);

        let binding = self
            .bindings
            .entry(name)
            .or_insert_with(|| VarBinding::HistogramValue(Vec::new()));
        if let VarBinding::HistogramValue(entries) = binding {
            entries.push((set, id));
        }
        Ok(id)
    }

    pub fn bind_gate(&mut self, name: &str, set: SetId, hist: HistogramId, gate: GateKind) -> Result<()> {
        self.check_kind(name, "histogram gate")?;
        let binding = self
            .bindings
            .entry(name.to_string())
            .or_insert_with(|| VarBinding::HistogramBucketGate(Vec::new()));
        if let VarBinding::HistogramBucketGate(entries) = binding {
            entries.push((set, hist, gate));
        }
        Ok(())
    }

    pub fn declare_range(&mut self, range: RangeIndex) -> Result<RangeId> {
        if self.bindings.contains_key(&range.output) || RESERVED_VARS.contains(&range.output.as_str()) {
            return Err(TallyError::config(format!(
                "variable \"{}\" is already declared",
                range.output
            )));
        }
        let id = RangeId(self.ranges.len());
        self.bindings.insert(range.output.clone(), VarBinding::RangeIndex(id));
        self.ranges.push(range);
        Ok(id)
    }

    pub fn binding(&self, name: &str) -> Option<&VarBinding> {
        self.bindings.get(name)
    }

    pub fn histogram(&self, id: HistogramId) -> &HistogramDef {
        &self.histograms[id.0]
    }

    pub fn find_histogram(&self, set: SetId, name: &str) -> Option<HistogramId> {
        self.sets[set.0]
            .histograms
            .iter()
            .copied()
            .find(|h| self.histograms[h.0].name == name)
    }

    pub fn histograms(&self) -> impl Iterator<Item = &HistogramDef> {
        self.histograms.iter()
    }

    pub fn ranges(&self) -> impl Iterator<Item = &RangeIndex> {
        self.ranges.iter()
    }

    pub fn range(&self, id: RangeId) -> &RangeIndex {
        &self.ranges[id.0]
    }

    fn check_kind(&self, name: &str, wanted: &'static str) -> Result<()> {
        if RESERVED_VARS.contains(&name) {
            return Err(TallyError::config(format!("variable \"{name}\" is reserved")));
        }
        match self.bindings.get(name) {
            Some(existing) if existing.kind() != wanted => Err(TallyError::config(format!(
                "variable \"{name}\" was already declared as a {}",
                existing.kind()
            ))),
            _ => Ok(()),
        }
    }
}
