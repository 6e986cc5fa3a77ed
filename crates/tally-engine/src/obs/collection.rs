//! JSON renderings of the live counters.
//!
//! Names are validated at configuration time, so output is written without
//! escaping. Sets whose storage is unreachable are left out.

use std::fmt::Write;

use tally_core::snapshot::{encode_collection, SetEntries};

use crate::model::{CounterSet, HistogramDef, Registry, SetId, VarBinding};
use crate::store::SetStore;

/// `{"<set>":{"<counter>":<int>,...},...}` over the sets accepted by `keep`.
pub fn render_counters(
    registry: &Registry,
    stores: &[Option<SetStore>],
    keep: impl Fn(&CounterSet) -> bool,
) -> String {
    let mut values: Vec<(&CounterSet, Vec<i64>)> = Vec::new();
    for (id, set) in registry.sets() {
        if !keep(set) {
            continue;
        }
        if let Some(store) = store_of(stores, id) {
            values.push((set, store.values()));
        }
    }

    let entries: Vec<SetEntries<'_>> = values
        .iter()
        .map(|(set, vals)| SetEntries {
            name: &set.name,
            counters: set.counters.iter().map(String::as_str).zip(vals.iter().copied()).collect(),
        })
        .collect();
    encode_collection(&entries)
}

/// `{"<set>":{"<hist>":{"<tag>":n,...,"sum":n,"err":n}}}` for sets with
/// histograms.
pub fn render_histograms(registry: &Registry, stores: &[Option<SetStore>]) -> String {
    let mut out = String::from("{");
    let mut first_set = true;

    for (id, set) in registry.sets() {
        if set.histograms.is_empty() {
            continue;
        }
        let Some(store) = store_of(stores, id) else {
            continue;
        };

        if !first_set {
            out.push(',');
        }
        first_set = false;
        let _ = write!(out, "\"{}\":{{", set.name);

        for (i, hid) in set.histograms.iter().enumerate() {
            let hist = registry.histogram(*hid);
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "\"{}\":{{", hist.name);
            for (k, counter) in hist.buckets.iter().enumerate() {
                let _ = write!(out, "\"{}\":{},", bucket_tag(registry, hist, k), store.load(*counter).unwrap_or(0));
            }
            let _ = write!(
                out,
                "\"sum\":{},\"err\":{}}}",
                store.load(hist.sum).unwrap_or(0),
                store.load(hist.err).unwrap_or(0)
            );
        }
        out.push('}');
    }
    out.push('}');
    out
}

/// Boundary text when the histogram is bound to a range index, otherwise the
/// two-digit bucket number.
pub fn bucket_tag(registry: &Registry, hist: &HistogramDef, k: usize) -> String {
    match registry.binding(&hist.bound) {
        Some(VarBinding::RangeIndex(id)) => registry.range(*id).tag(k).to_string(),
        _ => format!("{k:02}"),
    }
}

fn store_of(stores: &[Option<SetStore>], id: SetId) -> Option<&SetStore> {
    stores.get(id.0).and_then(Option::as_ref)
}
