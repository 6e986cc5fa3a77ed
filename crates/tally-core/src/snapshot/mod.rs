//! Snapshot wire format (persistent counters).
//!
//! A snapshot is a UTF-8 JSON object whose keys are counter set names and
//! whose values are objects mapping counter names to 64-bit integers:
//!
//! ```text
//! {"app":{"req_total":10,"req_4xx":1},"static":{"hits":3}}
//! ```
//!
//! - Decoding validates only the top-level shape eagerly. Looking up a set
//!   fails if any stored set is not an object; non-integer counter values
//!   are checked per set, so one set with a bad value does not prevent the
//!   others from loading.
//! - Encoding never escapes: set and counter names are validated at
//!   configuration time, which lets the writer size its buffer exactly.

pub mod decode;
pub mod encode;

pub use decode::{decode_snapshot, Snapshot};
pub use encode::{encode_collection, encoded_len, SetEntries, MAX_INT_LEN};
