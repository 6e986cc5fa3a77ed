//! Top-level facade crate for tally.
//!
//! Re-exports the core types and the engine library so users can depend on a single crate.

pub mod core {
    pub use tally_core::*;
}

pub mod engine {
    pub use tally_engine::*;
}
