//! tally core: error types, runtime value parsing and the snapshot wire format.
//!
//! This crate defines the contracts shared by the engine and any tooling that
//! reads persisted counters. It carries no storage or configuration
//! dependencies so it can be reused to inspect snapshot files offline.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed snapshots and unparseable runtime values surface as
//! `TallyError`/`Result`, never as a crashed worker.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod snapshot;
pub mod value;

/// Shared result type.
pub use error::{ErrorClass, Result, TallyError};
