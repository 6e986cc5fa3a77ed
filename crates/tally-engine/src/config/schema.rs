use std::time::Duration;

use serde::Deserialize;
use tally_core::error::{Result, TallyError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    pub version: u32,

    /// Global default for groups that do not say otherwise.
    #[serde(default)]
    pub survive_reload: bool,

    #[serde(default)]
    pub display_unreachable_counter_as: String,

    /// Capacity of each set's shared zone, in slots.
    #[serde(default = "default_zone_slots")]
    pub zone_slots: usize,

    #[serde(default)]
    pub persistent_storage: Option<PersistentStorageSection>,

    #[serde(default)]
    pub range_indexes: Vec<RangeIndexConfig>,

    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

impl TallyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TallyError::config(format!("unsupported config version {}", self.version)));
        }
        if !(2..=MAX_ZONE_SLOTS).contains(&self.zone_slots) {
            return Err(TallyError::config(format!(
                "zone_slots must be between 2 and {MAX_ZONE_SLOTS}"
            )));
        }

        if let Some(storage) = &self.persistent_storage {
            storage.validate()?;
        }

        for range in &self.range_indexes {
            validate_var_name(&range.source)?;
            validate_var_name(&range.output)?;
        }

        for (i, group) in self.groups.iter().enumerate() {
            if group.counter_set_id.as_deref() == Some("") {
                return Err(TallyError::config(format!("groups[{i}]: empty counter_set_id")));
            }
            if let Some(key) = group.set_key() {
                validate_set_name(key)?;
            }
            validate_rules(&group.rules)?;
            for scope in &group.scopes {
                scope.validate()?;
            }
        }
        Ok(())
    }
}

const MAX_ZONE_SLOTS: usize = 1 << 20;

fn default_zone_slots() -> usize {
    1024
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistentStorageSection {
    pub path: String,
    #[serde(default)]
    pub check_interval: Option<String>,
}

impl PersistentStorageSection {
    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() || self.path.ends_with('/') {
            return Err(TallyError::config(format!("bad persistent storage file name \"{}\"", self.path)));
        }
        if let Some(interval) = &self.check_interval {
            if parse_interval(interval)?.is_zero() {
                return Err(TallyError::config("check interval must be greater than zero"));
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Result<Option<Duration>> {
        self.check_interval.as_deref().map(parse_interval).transpose()
    }
}

/// Parse `<n>[ms|s|m|h|d]`; a bare number is seconds.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let bad = || TallyError::config(format!("bad check interval \"{s}\""));

    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let n: u64 = digits.parse().map_err(|_| bad())?;

    let secs = match unit {
        "ms" => return Ok(Duration::from_millis(n)),
        "" | "s" => n,
        "m" => n.checked_mul(60).ok_or_else(bad)?,
        "h" => n.checked_mul(3600).ok_or_else(bad)?,
        "d" => n.checked_mul(86400).ok_or_else(bad)?,
        _ => return Err(bad()),
    };
    Ok(Duration::from_secs(secs))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeIndexConfig {
    pub source: String,
    pub output: String,
    #[serde(default)]
    pub boundaries: Vec<Scalar>,
}

/// A server block: owns at most one counter set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    #[serde(default)]
    pub counter_set_id: Option<String>,
    #[serde(default)]
    pub server_names: Vec<String>,
    #[serde(default)]
    pub survive_reload: Option<bool>,
    #[serde(default)]
    pub display_unreachable_counter_as: Option<String>,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
}

impl GroupConfig {
    /// Counter set key: explicit id, else the last server name.
    pub fn set_key(&self) -> Option<&str> {
        self.counter_set_id
            .as_deref()
            .or_else(|| self.server_names.last().map(String::as_str))
            .filter(|k| !k.is_empty())
    }
}

/// A location: nested freely, inherits from its parent.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    pub name: String,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
}

impl ScopeConfig {
    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(TallyError::config("scope name must not be empty"));
        }
        validate_rules(&self.rules)?;
        for child in &self.scopes {
            child.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Counter(CounterDirective),
    EarlyCounter(CounterDirective),
    Histogram(HistogramDirective),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CounterDirective {
    pub name: String,
    #[serde(default)]
    pub op: Option<CounterOp>,
    #[serde(default)]
    pub value: Option<Scalar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterOp {
    Inc,
    Set,
    Undo,
}

/// Either a declaration (`bins` + `bound`) or an operation on a declared
/// histogram (`op`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistogramDirective {
    pub name: String,
    #[serde(default)]
    pub bins: Option<usize>,
    #[serde(default)]
    pub bound: Option<String>,
    #[serde(default)]
    pub op: Option<HistogramOp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistogramOp {
    Undo,
    Reset,
}

/// Scalar that may be written as a YAML number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Textual form, as it would have been written in a directive.
    pub fn as_text(&self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }
}

fn validate_rules(rules: &[Rule]) -> Result<()> {
    for rule in rules {
        match rule {
            Rule::Counter(c) | Rule::EarlyCounter(c) => validate_var_name(&c.name)?,
            Rule::Histogram(h) => {
                validate_var_name(&h.name)?;
                match (h.op, h.bins, &h.bound) {
                    (Some(_), None, None) => {}
                    (None, Some(_), Some(bound)) => validate_var_name(bound)?,
                    _ => {
                        return Err(TallyError::config(format!(
                            "histogram \"{}\" needs either bins and bound, or op",
                            h.name
                        )))
                    }
                }
            }
        }
    }
    Ok(())
}

/// Variable and counter names: `[A-Za-z0-9_]+`.
pub fn validate_var_name(name: &str) -> Result<()> {
    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Ok(())
    } else {
        Err(TallyError::config(format!("invalid variable name \"{name}\"")))
    }
}

/// Set names end up unescaped in JSON output and as snapshot keys.
pub fn validate_set_name(name: &str) -> Result<()> {
    if !name.is_empty() && !name.chars().any(|c| c == '"' || c == '\\' || c.is_control()) {
        Ok(())
    } else {
        Err(TallyError::config(format!("invalid counter set name \"{}\"", name.escape_debug())))
    }
}
