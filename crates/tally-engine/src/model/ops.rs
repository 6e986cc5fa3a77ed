//! Update operations and the scope merge rules.
//!
//! Every scope owns a list of [`UpdateOp`]s keyed by target counter. A scope's
//! declarations are merged into its own list as they are declared; the
//! effective list is then built by merging that own list on top of a deep
//! copy of the parent's effective list (see [`ScopeOps::inherit`]).

use tally_core::error::{Result, TallyError};
use tally_core::value::parse_int;

use crate::config::schema::{CounterOp, Scalar};

/// Stable index of a counter inside its counter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterId(pub usize);

/// Point of the unit of work at which an op is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before main processing.
    Early,
    /// After processing, when the final outcome is known.
    Late,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Set,
    Increment,
    /// Placeholder that disables inherited ops; behaves as an increment by 0.
    Undo,
}

/// A value resolved at update time, contributing `±parse_int(value)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeVarRef {
    pub name: String,
    pub negative: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOp {
    pub target: CounterId,
    pub kind: OpKind,
    pub literal: i64,
    pub refs: Vec<RuntimeVarRef>,
    pub phase: Phase,
}

/// Parsed right-hand side of a counter directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(i64),
    Var(RuntimeVarRef),
}

impl Operand {
    /// Parse `42`, `-42`, `$var` or `-$var`.
    pub fn parse(raw: &Scalar) -> Result<Self> {
        let text = match raw {
            Scalar::Int(n) => return Ok(Operand::Literal(*n)),
            Scalar::Float(f) => return Err(TallyError::config(format!("not a number \"{f}\""))),
            Scalar::Text(s) => s.as_str(),
        };

        let (negative, var) = match text.strip_prefix("-$") {
            Some(name) => (true, Some(name)),
            None => (false, text.strip_prefix('$')),
        };

        if let Some(name) = var {
            if name.is_empty() {
                return Err(TallyError::config(format!("invalid variable name \"{text}\"")));
            }
            return Ok(Operand::Var(RuntimeVarRef { name: name.to_string(), negative }));
        }

        parse_int(text)
            .map(Operand::Literal)
            .ok_or_else(|| TallyError::config(format!("not a number \"{text}\"")))
    }
}

impl UpdateOp {
    /// Build an op from directive arguments.
    ///
    /// - no operation: declaration only, increment by 0;
    /// - `inc`/`set` without operand: literal 1;
    /// - `undo` accepts no operand.
    pub fn from_directive(
        target: CounterId,
        op: Option<CounterOp>,
        value: Option<&Scalar>,
        phase: Phase,
    ) -> Result<Self> {
        let kind = match op {
            None => OpKind::Increment,
            Some(CounterOp::Inc) => OpKind::Increment,
            Some(CounterOp::Set) => OpKind::Set,
            Some(CounterOp::Undo) => OpKind::Undo,
        };

        if phase == Phase::Early && kind == OpKind::Undo {
            return Err(TallyError::config("early counter operation must be \"inc\" or \"set\""));
        }
        if kind == OpKind::Undo && value.is_some() {
            return Err(TallyError::config("counter operation \"undo\" does not accept arguments"));
        }
        if op.is_none() && value.is_some() {
            return Err(TallyError::config("counter value requires an operation"));
        }

        let (literal, refs) = match value.map(Operand::parse).transpose()? {
            Some(Operand::Literal(n)) => (n, Vec::new()),
            Some(Operand::Var(r)) => (0, vec![r]),
            None if op.is_none() || kind == OpKind::Undo => (0, Vec::new()),
            None => (1, Vec::new()),
        };

        Ok(Self { target, kind, literal, refs, phase })
    }

    /// `undo` generated for a histogram counter.
    pub fn undo(target: CounterId) -> Self {
        Self { target, kind: OpKind::Undo, literal: 0, refs: Vec::new(), phase: Phase::Late }
    }

    /// `set 0` generated for a histogram reset.
    pub fn reset(target: CounterId) -> Self {
        Self { target, kind: OpKind::Set, literal: 0, refs: Vec::new(), phase: Phase::Late }
    }

    /// Late increment gated by a single runtime reference.
    pub fn gated_inc(target: CounterId, gate: String) -> Self {
        Self {
            target,
            kind: OpKind::Increment,
            literal: 0,
            refs: vec![RuntimeVarRef { name: gate, negative: false }],
            phase: Phase::Late,
        }
    }
}

/// Merged update list of one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeOps {
    ops: Vec<UpdateOp>,
}

impl ScopeOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UpdateOp> {
        self.ops.iter()
    }

    pub fn get(&self, target: CounterId) -> Option<&UpdateOp> {
        self.ops.iter().find(|op| op.target == target)
    }

    /// Merge one op into the list.
    ///
    /// An increment accumulates into an existing entry (reviving an undo);
    /// a set or undo replaces it. Both must agree on phase.
    pub fn merge(&mut self, op: UpdateOp) -> Result<()> {
        let Some(existing) = self.ops.iter_mut().find(|e| e.target == op.target) else {
            self.ops.push(op);
            return Ok(());
        };

        if existing.phase != op.phase {
            return Err(TallyError::config(
                "counter was set both normal and early in the same scope",
            ));
        }

        match op.kind {
            OpKind::Increment => {
                if existing.kind == OpKind::Undo {
                    existing.kind = OpKind::Increment;
                }
                existing.literal = existing.literal.wrapping_add(op.literal);
                existing.refs.extend(op.refs);
            }
            OpKind::Set | OpKind::Undo => *existing = op,
        }
        Ok(())
    }

    /// Effective list of a child scope: the parent's list (deep copy) with the
    /// child's own entries merged on top. An empty parent leaves the child's
    /// own list unchanged.
    pub fn inherit(parent: &ScopeOps, own: &ScopeOps) -> Result<ScopeOps> {
        if parent.is_empty() {
            return Ok(own.clone());
        }
        let mut merged = parent.clone();
        for op in &own.ops {
            merged.merge(op.clone())?;
        }
        Ok(merged)
    }
}
