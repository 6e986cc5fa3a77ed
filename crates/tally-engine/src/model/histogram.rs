//! Histograms: a group of bucket counters plus `sum` and `err`, each gated by
//! an engine-computed variable.
//!
//! Declaring histogram `lat` with 3 bins in a set creates counters
//! `lat_00 lat_01 lat_02 lat_sum lat_err`, gate variables `inc_lat_00 ..
//! inc_lat_err`, and for every counter a Late `inc $inc_<counter>` in the
//! declaring scope. Per update exactly one of {a bucket, `err`} sees a 1, and
//! `sum` sees a 1 iff a bucket does.

use tally_core::error::{Result, TallyError};
use tally_core::value::parse_unsigned;

use super::ops::{CounterId, ScopeOps, UpdateOp};
use super::registry::{Registry, SetId};
use crate::config::schema::HistogramOp;
use crate::exec::VarValue;

pub const MAX_BINS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistogramId(pub usize);

/// Which counter of a histogram a gate variable guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    Bucket(usize),
    Sum,
    Err,
}

#[derive(Debug, Clone)]
pub struct HistogramDef {
    pub set: SetId,
    pub name: String,
    /// Variable whose value selects the bucket.
    pub bound: String,
    pub buckets: Vec<CounterId>,
    pub sum: CounterId,
    pub err: CounterId,
}

impl HistogramDef {
    pub fn bins(&self) -> usize {
        self.buckets.len()
    }

    /// Buckets, then `sum`, then `err`.
    pub fn counters(&self) -> impl Iterator<Item = CounterId> + '_ {
        self.buckets.iter().copied().chain([self.sum, self.err])
    }
}

pub fn bucket_counter_name(hist: &str, k: usize) -> String {
    format!("{hist}_{k:02}")
}

pub fn gate_var_name(counter: &str) -> String {
    format!("inc_{counter}")
}

/// Declare histogram `name` in `set` and add its gated increments to `ops`.
pub fn declare(
    registry: &mut Registry,
    ops: &mut ScopeOps,
    set: SetId,
    name: &str,
    bins: usize,
    bound: &str,
) -> Result<HistogramId> {
    if bins == 0 || bins > MAX_BINS {
        return Err(TallyError::config(format!(
            "number of bins must be greater than 0 but not greater than {MAX_BINS}"
        )));
    }
    if registry.find_histogram(set, name).is_some() {
        return Err(TallyError::config(format!(
            "histogram \"{name}\" was already declared in this counter set"
        )));
    }

    let mut named = Vec::with_capacity(bins + 2);
    for k in 0..bins {
        named.push((bucket_counter_name(name, k), GateKind::Bucket(k)));
    }
    named.push((format!("{name}_sum"), GateKind::Sum));
    named.push((format!("{name}_err"), GateKind::Err));

    let mut ids = Vec::with_capacity(named.len());
    for (counter, _) in &named {
        ids.push(registry.intern_counter(set, counter)?);
    }

    let def = HistogramDef {
        set,
        name: name.to_string(),
        bound: bound.to_string(),
        buckets: ids[..bins].to_vec(),
        sum: ids[bins],
        err: ids[bins + 1],
    };
    let id = registry.push_histogram(def)?;

    for ((counter, gate), target) in named.into_iter().zip(ids) {
        let gate_name = gate_var_name(&counter);
        registry.bind_gate(&gate_name, set, id, gate)?;
        ops.merge(UpdateOp::gated_inc(target, gate_name))?;
    }
    Ok(id)
}

/// `undo` or `reset` every counter of an already declared histogram.
pub fn operate(registry: &Registry, ops: &mut ScopeOps, set: SetId, name: &str, op: HistogramOp) -> Result<()> {
    let id = registry.find_histogram(set, name).ok_or_else(|| {
        TallyError::config(format!("histogram \"{name}\" was not declared in this counter set"))
    })?;
    for counter in registry.histogram(id).counters() {
        let update = match op {
            HistogramOp::Undo => UpdateOp::undo(counter),
            HistogramOp::Reset => UpdateOp::reset(counter),
        };
        ops.merge(update)?;
    }
    Ok(())
}

/// Gate value for one counter given the bound variable's value.
pub fn gate_open(gate: GateKind, bins: usize, bound: &VarValue) -> bool {
    let bucket = if bound.is_usable() {
        parse_unsigned(&bound.text)
            .and_then(|v| usize::try_from(v).ok())
            .filter(|v| *v < bins)
    } else {
        None
    };

    match (gate, bucket) {
        (GateKind::Bucket(k), Some(b)) => k == b,
        (GateKind::Sum, Some(_)) => true,
        (GateKind::Err, None) => true,
        _ => false,
    }
}
