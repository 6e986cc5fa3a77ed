//! Update execution: resolving runtime references and applying ops.

pub mod executor;
pub mod resolver;

pub use executor::{apply, ApplyStats, ValueSource};
pub use resolver::{HostResolver, NoHostVars, VarValue};
