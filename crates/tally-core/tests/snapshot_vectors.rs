//! Snapshot decoding vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use tally_core::snapshot::{decode_snapshot, encode_collection, SetEntries};

mod vector_loader;
use vector_loader::load;

#[test]
fn snapshot_vectors() {
    let files = [
        "snapshot_two_sets.json",
        "snapshot_negative.json",
        "snapshot_not_object.json",
        "snapshot_malformed.json",
        "snapshot_empty.json",
        "snapshot_bad_value.json",
        "snapshot_set_not_object.json",
    ];

    for f in files {
        let v = load(f);
        let res = decode_snapshot(f, &v.input).and_then(|s| {
            let set = v.set.clone().unwrap_or_default();
            s.values_for(&set)
        });

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.class().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let values = res.expect("expected ok snapshot");
        let ex = v.expect.expect("missing expect block");
        let ex = ex.as_object().unwrap();

        assert_eq!(values.len(), ex.len(), "vector={}", v.description);
        for (name, value) in &values {
            assert_eq!(Some(*value), ex[name].as_i64(), "vector={} counter={}", v.description, name);
        }
    }
}

#[test]
fn write_load_write_is_stable() {
    let sets = [
        SetEntries { name: "app", counters: vec![("req_total", 10), ("req_4xx", -3)] },
        SetEntries { name: "static", counters: vec![("hits", i64::MAX)] },
    ];
    let first = encode_collection(&sets);

    let snapshot = decode_snapshot("mem", &first).unwrap();
    for set in &sets {
        for (name, value) in &set.counters {
            assert_eq!(snapshot.get(set.name, name), Some(*value));
        }
    }

    let app = snapshot.values_for("app").unwrap();
    let stat = snapshot.values_for("static").unwrap();
    let reloaded = [
        SetEntries {
            name: "app",
            counters: sets[0]
                .counters
                .iter()
                .map(|(n, _)| (*n, app.iter().find(|(k, _)| k == n).unwrap().1))
                .collect(),
        },
        SetEntries { name: "static", counters: vec![("hits", stat[0].1)] },
    ];
    assert_eq!(encode_collection(&reloaded), first);
}
