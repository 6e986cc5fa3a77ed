//! Snapshot decoding.

use serde_json::{Map, Value};

use crate::error::{Result, TallyError};

/// A decoded snapshot. Cheap to keep around for the whole startup: it is
/// consulted once per counter set on first-ever region initialization.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    sets: Map<String, Value>,
}

/// Decode snapshot text. `source` names the file for error context.
///
/// Empty input, malformed JSON, or a non-object top level are errors; the
/// caller decides whether they are fatal.
pub fn decode_snapshot(source: &str, text: &str) -> Result<Snapshot> {
    if text.trim().is_empty() {
        return Err(TallyError::persistence(source, "file is empty"));
    }

    let value: Value = serde_json::from_str(text)
        .map_err(|e| TallyError::persistence(source, format!("JSON parse error: {e}")))?;

    match value {
        Value::Object(sets) => Ok(Snapshot { sets }),
        _ => Err(TallyError::persistence(
            source,
            "unexpected structure of JSON data: the whole data is not an object",
        )),
    }
}

impl Snapshot {
    /// Empty snapshot (no persistent storage configured, or nothing stored yet).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Names of the stored counter sets.
    pub fn set_names(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    /// Stored values of one counter set, ordered by counter name.
    ///
    /// Every stored set must be an object, and every value of the requested
    /// set must be an integer; otherwise the whole lookup fails. A set absent
    /// from the snapshot yields an empty list.
    pub fn values_for(&self, set: &str) -> Result<Vec<(String, i64)>> {
        for (name, value) in &self.sets {
            if !value.is_object() {
                return Err(TallyError::persistence(
                    name,
                    "unexpected structure of JSON data: value is not an object",
                ));
            }
        }

        let Some(Value::Object(counters)) = self.sets.get(set) else {
            return Ok(Vec::new());
        };

        counters
            .iter()
            .map(|(name, v)| {
                v.as_i64().map(|n| (name.clone(), n)).ok_or_else(|| {
                    TallyError::persistence(set, format!("not a number \"{v}\" for counter \"{name}\""))
                })
            })
            .collect()
    }

    /// Single stored value, if present and well-formed.
    pub fn get(&self, set: &str, counter: &str) -> Option<i64> {
        self.sets.get(set)?.get(counter)?.as_i64()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_object_top_level() {
        let err = decode_snapshot("s.json", "[1,2]").unwrap_err();
        assert_eq!(err.class().as_str(), "PERSISTENCE");
    }

    #[test]
    fn absent_set_is_empty() {
        let s = decode_snapshot("s.json", r#"{"a":{"x":1}}"#).unwrap();
        assert!(s.values_for("b").unwrap().is_empty());
        assert_eq!(s.get("a", "x"), Some(1));
    }

    #[test]
    fn damaged_sibling_set_fails_lookup() {
        let s = decode_snapshot("s.json", r#"{"a":{"x":1},"b":7}"#).unwrap();
        assert!(s.values_for("a").is_err());
    }
}
