//! Applies a scope's update list to a counter set.

use tally_core::error::TallyError;
use tally_core::value::parse_int;

use super::resolver::VarValue;
use crate::model::{OpKind, Phase, ScopeOps, UpdateOp};
use crate::store::SetStore;

/// Resolves any variable visible to a scope (engine-computed or host).
pub trait ValueSource {
    fn value(&self, name: &str) -> VarValue;
}

/// Outcome of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub applied: usize,
    pub skipped: usize,
}

/// Apply every op of `phase` in `ops`.
///
/// An op is skipped when any of its runtime references is missing or does
/// not parse as an integer; the other ops still run.
pub fn apply<S: ValueSource + ?Sized>(ops: &ScopeOps, phase: Phase, values: &S, store: &SetStore) -> ApplyStats {
    let mut stats = ApplyStats::default();

    for op in ops.iter().filter(|op| op.phase == phase) {
        if op.kind == OpKind::Undo {
            continue;
        }

        let Some(total) = evaluate(op, values) else {
            stats.skipped += 1;
            continue;
        };

        let ok = match op.kind {
            OpKind::Set => store.set(op.target, total),
            OpKind::Increment if total != 0 => store.increment(op.target, total),
            _ => true,
        };
        if ok {
            stats.applied += 1;
        } else {
            tracing::warn!(counter = op.target.0, "counter update dropped");
            stats.skipped += 1;
        }
    }
    stats
}

/// Literal plus every signed reference. `None` when any reference fails;
/// all references are still evaluated so each failure is logged.
fn evaluate<S: ValueSource + ?Sized>(op: &UpdateOp, values: &S) -> Option<i64> {
    let mut total = op.literal;
    let mut failed = false;

    for r in &op.refs {
        let v = values.value(&r.name);
        let parsed = if v.is_usable() { parse_int(&v.text) } else { None };
        match parsed {
            Some(n) => {
                let n = if r.negative { n.wrapping_neg() } else { n };
                total = total.wrapping_add(n);
            }
            None => {
                let err = if v.is_usable() {
                    TallyError::NotANumber { name: r.name.clone(), value: v.text }
                } else {
                    TallyError::Unavailable(r.name.clone())
                };
                tracing::warn!(code = err.class().as_str(), "{err}");
                failed = true;
            }
        }
    }

    (!failed).then_some(total)
}
