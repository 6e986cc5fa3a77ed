//! Read-only views of the counters: collections rendered as JSON.

pub mod collection;

pub use collection::{bucket_tag, render_counters, render_histograms};
