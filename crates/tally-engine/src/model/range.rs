//! Range index: maps a numeric input to the index of the first boundary that
//! is not below it.

use tally_core::error::{Result, TallyError};
use tally_core::value::parse_number;

use crate::config::schema::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeId(pub usize);

#[derive(Debug, Clone)]
pub struct Boundary {
    pub value: f64,
    /// Text as declared; used as the bucket tag in the histogram collection.
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct RangeIndex {
    pub source: String,
    pub output: String,
    pub boundaries: Vec<Boundary>,
}

/// Outcome of classifying one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Bucket(usize),
    /// The input did not parse as a number.
    Error,
}

impl Classification {
    /// Text value of the output variable (`"error"` when invalid).
    pub fn as_text(self) -> String {
        match self {
            Classification::Bucket(i) => i.to_string(),
            Classification::Error => "error".into(),
        }
    }
}

impl RangeIndex {
    pub fn declare(source: &str, output: &str, raw: &[Scalar]) -> Result<Self> {
        let mut boundaries: Vec<Boundary> = Vec::with_capacity(raw.len());
        for b in raw {
            let text = b.as_text();
            let value = parse_number(&text)
                .ok_or_else(|| TallyError::config(format!("bad range boundary \"{text}\"")))?;
            if let Some(prev) = boundaries.last() {
                if prev.value >= value {
                    return Err(TallyError::config(format!(
                        "range boundaries must increase: \"{}\" is not greater than \"{}\"",
                        text, prev.text
                    )));
                }
            }
            boundaries.push(Boundary { value, text });
        }
        Ok(Self { source: source.to_string(), output: output.to_string(), boundaries })
    }

    /// Index of the first boundary `b` with `value <= b`, or the number of
    /// boundaries when the value exceeds them all.
    pub fn classify(&self, input: &str) -> Classification {
        let Some(value) = parse_number(input) else {
            return Classification::Error;
        };
        let idx = self
            .boundaries
            .iter()
            .position(|b| value <= b.value)
            .unwrap_or(self.boundaries.len());
        Classification::Bucket(idx)
    }

    /// Tag of bucket `k`: the boundary text, `+Inf` past the last one.
    pub fn tag(&self, k: usize) -> &str {
        self.boundaries.get(k).map(|b| b.text.as_str()).unwrap_or("+Inf")
    }
}
