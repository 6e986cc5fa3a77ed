//! tally engine library entry.
//!
//! Wires the config loader, model compiler, shared store, executor and
//! persistent storage into the [`engine::Engine`]. Consumed by the binary
//! (`main.rs`), by hosts embedding the counters, and by integration tests.

pub mod config;
pub mod engine;
pub mod exec;
pub mod model;
pub mod obs;
pub mod persist;
pub mod state;
pub mod store;

pub use engine::Engine;
pub use exec::{HostResolver, NoHostVars, VarValue};
pub use model::{Phase, ScopeId};
pub use state::ProcessState;
