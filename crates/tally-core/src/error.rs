//! Shared error type across tally crates.

use thiserror::Error;

/// Error classes (stable API, used in logs and by callers deciding whether a
/// failure is fatal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Invalid directive arguments, duplicates, conflicting phase or kind.
    Config,
    /// A referenced value was missing or unparseable during an update.
    RuntimeSkip,
    /// Shared region allocation failed.
    Storage,
    /// Snapshot I/O or JSON errors.
    Persistence,
}

impl ErrorClass {
    /// String representation used in log fields and test vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Config => "CONFIG",
            ErrorClass::RuntimeSkip => "RUNTIME_SKIP",
            ErrorClass::Storage => "STORAGE",
            ErrorClass::Persistence => "PERSISTENCE",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TallyError>;

/// Unified error type used by core and engine.
#[derive(Debug, Error)]
pub enum TallyError {
    #[error("config: {0}")]
    Config(String),
    #[error("variable \"{name}\" has value \"{value}\" which is not a number")]
    NotANumber { name: String, value: String },
    #[error("variable \"{0}\" is not available")]
    Unavailable(String),
    #[error("counter set \"{set}\": {reason}")]
    Storage { set: String, reason: String },
    #[error("persistent storage \"{path}\": {reason}")]
    Persistence { path: String, reason: String },
}

impl TallyError {
    /// Shorthand for a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        TallyError::Config(msg.into())
    }

    pub fn persistence(path: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        TallyError::Persistence {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Map an error to its stable class.
    pub fn class(&self) -> ErrorClass {
        match self {
            TallyError::Config(_) => ErrorClass::Config,
            TallyError::NotANumber { .. } | TallyError::Unavailable(_) => ErrorClass::RuntimeSkip,
            TallyError::Storage { .. } => ErrorClass::Storage,
            TallyError::Persistence { .. } => ErrorClass::Persistence,
        }
    }
}
