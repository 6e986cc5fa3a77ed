//! Snapshot encoding with an exact, precomputed buffer size.

use std::fmt::Write;

/// Upper bound on the decimal length of an `i64` (`-9223372036854775808`).
pub const MAX_INT_LEN: usize = 20;

/// One counter set as seen by the writer: its name and the current values of
/// its counters in index order.
#[derive(Debug, Clone)]
pub struct SetEntries<'a> {
    pub name: &'a str,
    pub counters: Vec<(&'a str, i64)>,
}

/// Buffer size that is always sufficient for [`encode_collection`].
///
/// Per set: two quotes, colon, two braces, separating comma, plus the name.
/// Per counter: two quotes, colon, separating comma, the name and
/// [`MAX_INT_LEN`].
pub fn encoded_len(sets: &[SetEntries<'_>]) -> usize {
    let mut len = 2;
    for set in sets {
        len += 2 + 1 + 2 + 1 + set.name.len();
        for (name, _) in &set.counters {
            len += 2 + 1 + 1 + name.len() + MAX_INT_LEN;
        }
    }
    len
}

/// Encode sets as `{"<set>":{"<counter>":<int>,...},...}`.
pub fn encode_collection(sets: &[SetEntries<'_>]) -> String {
    let mut out = String::with_capacity(encoded_len(sets));
    out.push('{');
    for (i, set) in sets.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "\"{}\":{{", set.name);
        for (j, (name, value)) in set.counters.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            let _ = write!(out, "\"{name}\":{value}");
        }
        out.push('}');
    }
    out.push('}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collection() {
        assert_eq!(encode_collection(&[]), "{}");
    }

    #[test]
    fn buffer_bound_holds_for_extreme_values() {
        let sets = [
            SetEntries { name: "a", counters: vec![("min", i64::MIN), ("max", i64::MAX)] },
            SetEntries { name: "empty", counters: vec![] },
        ];
        let out = encode_collection(&sets);
        assert_eq!(out, r#"{"a":{"min":-9223372036854775808,"max":9223372036854775807},"empty":{}}"#);
        assert!(out.len() <= encoded_len(&sets));
    }
}
