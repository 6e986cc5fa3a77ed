//! Compile a validated config into the immutable model: registry plus the
//! flattened scope tree with each scope's effective update list.

use tally_core::error::{Result, TallyError};

use super::histogram;
use super::ops::{Phase, ScopeOps, UpdateOp};
use super::range::RangeIndex;
use super::registry::{Registry, SetId, VarBinding};
use crate::config::schema::{GroupConfig, Rule, ScopeConfig, TallyConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone)]
pub struct CompiledGroup {
    /// Set name, or `#<index>` when the group has no set key.
    pub label: String,
    pub set: Option<SetId>,
    pub unreachable_mark: String,
}

#[derive(Debug, Clone)]
pub struct CompiledScope {
    /// Group label followed by nested scope names.
    pub path: Vec<String>,
    pub group: usize,
    pub ops: ScopeOps,
}

#[derive(Debug)]
pub struct Model {
    pub registry: Registry,
    pub groups: Vec<CompiledGroup>,
    pub scopes: Vec<CompiledScope>,
}

impl Model {
    pub fn scope(&self, id: ScopeId) -> Option<&CompiledScope> {
        self.scopes.get(id.0)
    }

    pub fn group_of(&self, id: ScopeId) -> Option<&CompiledGroup> {
        self.groups.get(self.scope(id)?.group)
    }

    /// Look a scope up by path. The first segment matches a group label or
    /// its `#<index>` alias.
    pub fn find_scope(&self, path: &[&str]) -> Option<ScopeId> {
        let (head, rest) = path.split_first()?;
        let alias = |group: usize| format!("#{group}");
        self.scopes
            .iter()
            .position(|s| {
                let Some((label, names)) = s.path.split_first() else {
                    return false;
                };
                (label == head || alias(s.group) == *head)
                    && names.len() == rest.len()
                    && names.iter().zip(rest).all(|(a, b)| a == b)
            })
            .map(ScopeId)
    }
}

pub fn compile(cfg: &TallyConfig) -> Result<Model> {
    let mut registry = Registry::new();

    for r in &cfg.range_indexes {
        let range = RangeIndex::declare(&r.source, &r.output, &r.boundaries)?;
        registry.declare_range(range)?;
    }

    let mut groups = Vec::with_capacity(cfg.groups.len());
    let mut scopes = Vec::new();

    for (gi, group) in cfg.groups.iter().enumerate() {
        let label = group.set_key().map(str::to_string).unwrap_or_else(|| format!("#{gi}"));

        let mut ctx = GroupCtx { registry: &mut registry, group, set: None, index: gi };
        let mut own = ScopeOps::new();
        for rule in &group.rules {
            ctx.apply_rule(&mut own, rule)?;
        }
        // groups inherit nothing: directives are not allowed at the global level
        let effective = own;

        let root = scopes.len();
        scopes.push(CompiledScope { path: vec![label.clone()], group: gi, ops: effective });
        for child in &group.scopes {
            compile_scope(&mut ctx, &mut scopes, root, child)?;
        }

        let set = ctx.set;
        groups.push(CompiledGroup {
            label,
            set,
            unreachable_mark: group
                .display_unreachable_counter_as
                .clone()
                .unwrap_or_else(|| cfg.display_unreachable_counter_as.clone()),
        });
    }

    // groups that declare nothing still read the set named by their key
    for (g, cfg_group) in groups.iter_mut().zip(&cfg.groups) {
        if g.set.is_none() {
            g.set = cfg_group.set_key().and_then(|k| registry.find_set(k));
        }
    }

    for (g, cfg_group) in groups.iter().zip(&cfg.groups) {
        if let Some(set) = g.set {
            if cfg_group.survive_reload.unwrap_or(cfg.survive_reload) {
                registry.mark_survive(set);
            }
        }
    }

    check_references(&registry)?;

    tracing::debug!(sets = registry.set_count(), scopes = scopes.len(), "model compiled");
    Ok(Model { registry, groups, scopes })
}

/// Engine-computed variables that feed other engine-computed variables must
/// not form a loop. Gates read their histogram's bound, which may be a range
/// output, so a range may read neither another range nor a gate.
fn check_references(registry: &Registry) -> Result<()> {
    for range in registry.ranges() {
        match registry.binding(&range.source) {
            Some(VarBinding::RangeIndex(_)) => {
                return Err(TallyError::config(format!(
                    "range index \"{}\" cannot read another range index \"{}\"",
                    range.output, range.source
                )))
            }
            Some(VarBinding::HistogramBucketGate(..)) => {
                return Err(TallyError::config(format!(
                    "range index \"{}\" cannot read gate variable \"{}\"",
                    range.output, range.source
                )))
            }
            _ => {}
        }
    }
    for hist in registry.histograms() {
        match registry.binding(&hist.bound) {
            Some(VarBinding::HistogramBucketGate(..)) => {
                return Err(TallyError::config(format!(
                    "histogram \"{}\" cannot be bound to gate variable \"{}\"",
                    hist.name, hist.bound
                )))
            }
            Some(VarBinding::RangeIndex(id)) => {
                let buckets = registry.range(*id).boundaries.len() + 1;
                if hist.bins() > buckets {
                    return Err(TallyError::config(format!(
                        "histogram \"{}\" has {} bins but range index \"{}\" yields only {buckets}",
                        hist.name,
                        hist.bins(),
                        hist.bound
                    )));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn compile_scope(
    ctx: &mut GroupCtx<'_>,
    scopes: &mut Vec<CompiledScope>,
    parent: usize,
    scope: &ScopeConfig,
) -> Result<()> {
    let mut own = ScopeOps::new();
    for rule in &scope.rules {
        ctx.apply_rule(&mut own, rule)?;
    }
    let effective = ScopeOps::inherit(&scopes[parent].ops, &own)
        .map_err(|e| TallyError::config(format!("scope \"{}\": {e}", scope.name)))?;

    let mut path = scopes[parent].path.clone();
    path.push(scope.name.clone());
    let id = scopes.len();
    scopes.push(CompiledScope { path, group: ctx.index, ops: effective });

    for child in &scope.scopes {
        compile_scope(ctx, scopes, id, child)?;
    }
    Ok(())
}

struct GroupCtx<'a> {
    registry: &'a mut Registry,
    group: &'a GroupConfig,
    set: Option<SetId>,
    index: usize,
}

impl GroupCtx<'_> {
    fn set(&mut self) -> Result<SetId> {
        if let Some(set) = self.set {
            return Ok(set);
        }
        let key = self.group.set_key().ok_or_else(|| {
            TallyError::config(format!(
                "groups[{}]: neither counter_set_id nor a server name is set",
                self.index
            ))
        })?;
        let set = self.registry.resolve_set(key);
        self.set = Some(set);
        Ok(set)
    }

    fn apply_rule(&mut self, ops: &mut ScopeOps, rule: &Rule) -> Result<()> {
        let set = self.set()?;
        match rule {
            Rule::Counter(c) | Rule::EarlyCounter(c) => {
                let phase = if matches!(rule, Rule::EarlyCounter(_)) { Phase::Early } else { Phase::Late };
                let target = self.registry.intern_counter(set, &c.name)?;
                let op = UpdateOp::from_directive(target, c.op, c.value.as_ref(), phase)
                    .map_err(|e| TallyError::config(format!("counter \"{}\": {e}", c.name)))?;
                ops.merge(op)
            }
            Rule::Histogram(h) => match (h.op, h.bins, &h.bound) {
                (Some(op), _, _) => histogram::operate(self.registry, ops, set, &h.name, op),
                (None, Some(bins), Some(bound)) => {
                    histogram::declare(self.registry, ops, set, &h.name, bins, bound).map(|_| ())
                }
                _ => Err(TallyError::config(format!(
                    "histogram \"{}\" needs either bins and bound, or op",
                    h.name
                ))),
            },
        }
    }
}
