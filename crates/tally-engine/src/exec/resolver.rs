//! Runtime variable values and the host lookup seam.

use std::collections::HashMap;

/// Value of a variable for one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarValue {
    pub text: String,
    pub valid: bool,
    pub not_found: bool,
}

impl VarValue {
    pub fn found(text: impl Into<String>) -> Self {
        Self { text: text.into(), valid: true, not_found: false }
    }

    /// Present but flagged invalid by its producer.
    pub fn invalid(text: impl Into<String>) -> Self {
        Self { text: text.into(), valid: false, not_found: false }
    }

    pub fn not_found() -> Self {
        Self { text: String::new(), valid: false, not_found: true }
    }

    pub fn is_usable(&self) -> bool {
        self.valid && !self.not_found
    }
}

/// Variables supplied by the host for the current unit of work.
pub trait HostResolver {
    fn resolve(&self, name: &str) -> VarValue;
}

impl HostResolver for HashMap<String, String> {
    fn resolve(&self, name: &str) -> VarValue {
        self.get(name).map(VarValue::found).unwrap_or_else(VarValue::not_found)
    }
}

impl<R: HostResolver + ?Sized> HostResolver for &R {
    fn resolve(&self, name: &str) -> VarValue {
        (**self).resolve(name)
    }
}

/// Host that knows no variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHostVars;

impl HostResolver for NoHostVars {
    fn resolve(&self, _name: &str) -> VarValue {
        VarValue::not_found()
    }
}
