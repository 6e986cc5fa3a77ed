//! Configuration model: counter sets, update lists, histograms, range
//! indexes, and the compiled scope tree.

pub mod compile;
pub mod histogram;
pub mod ops;
pub mod range;
pub mod registry;

pub use compile::{compile, CompiledGroup, CompiledScope, Model, ScopeId};
pub use histogram::{GateKind, HistogramDef, HistogramId};
pub use ops::{CounterId, OpKind, Phase, RuntimeVarRef, ScopeOps, UpdateOp};
pub use range::{Classification, RangeId, RangeIndex};
pub use registry::{CounterSet, Registry, SetId, VarBinding};
