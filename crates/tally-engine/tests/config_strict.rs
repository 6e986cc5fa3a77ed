#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use tally_engine::{config, Engine, ProcessState};

fn build(yaml: &str) -> tally_core::Result<Engine> {
    let cfg = config::load_from_str(yaml)?;
    Engine::new(cfg, Arc::new(ProcessState::new()))
}

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
groups:
  - counter_set_id: app
    rules:
      - counter: { name: hits, opp: inc } # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.class().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.zone_slots, 1024);
    assert!(cfg.groups.is_empty());
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.class().as_str(), "CONFIG");
}

#[test]
fn bad_check_interval() {
    let bad = r#"
version: 1
persistent_storage:
  path: /tmp/counters.json
  check_interval: 10 minutes
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn check_interval_units() {
    use std::time::Duration;
    use tally_engine::config::schema::parse_interval;

    assert_eq!(parse_interval("250ms").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_interval("10").unwrap(), Duration::from_secs(10));
    assert_eq!(parse_interval("2m").unwrap(), Duration::from_secs(120));
    assert_eq!(parse_interval("1d").unwrap(), Duration::from_secs(86400));
    assert!(parse_interval("s").is_err());
    assert!(parse_interval("5w").is_err());
}

#[test]
fn names_must_be_json_safe() {
    let bad = r#"
version: 1
groups:
  - counter_set_id: "app\"x"
    rules:
      - counter: { name: hits }
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn variable_names_are_word_characters_only() {
    let bad = r#"
version: 1
groups:
  - counter_set_id: app
    rules:
      - counter: { name: req.total }
"#;
    assert!(config::load_from_str(bad).is_err());

    let dotted_set = r#"
version: 1
groups:
  - server_names: [www.example.com]
    rules:
      - counter: { name: req_total }
"#;
    assert!(config::load_from_str(dotted_set).is_ok());
}

#[test]
fn histogram_needs_bins_and_bound() {
    let bad = r#"
version: 1
groups:
  - counter_set_id: app
    rules:
      - histogram: { name: lat, bins: 3 }
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn early_undo_is_rejected() {
    let bad = r#"
version: 1
groups:
  - counter_set_id: app
    rules:
      - early_counter: { name: seen, op: undo }
"#;
    let err = build(bad).err().expect("must fail");
    assert_eq!(err.class().as_str(), "CONFIG");
}

#[test]
fn same_counter_in_both_phases_is_rejected() {
    let bad = r#"
version: 1
groups:
  - counter_set_id: app
    rules:
      - counter: { name: hits, op: inc }
      - early_counter: { name: hits, op: inc }
"#;
    let err = build(bad).err().expect("must fail");
    assert!(err.to_string().contains("both normal and early"));
}

#[test]
fn phase_conflict_across_scopes_is_rejected() {
    let bad = r#"
version: 1
groups:
  - counter_set_id: app
    rules:
      - counter: { name: hits, op: inc }
    scopes:
      - name: /early
        rules:
          - early_counter: { name: hits, op: set, value: 0 }
"#;
    assert!(build(bad).is_err());
}

#[test]
fn undo_with_operand_is_rejected() {
    let bad = r#"
version: 1
groups:
  - counter_set_id: app
    rules:
      - counter: { name: hits, op: undo, value: 1 }
"#;
    assert!(build(bad).is_err());
}

#[test]
fn histogram_redeclared_or_unknown() {
    let redeclared = r#"
version: 1
groups:
  - counter_set_id: app
    rules:
      - histogram: { name: lat, bins: 2, bound: b }
    scopes:
      - name: /x
        rules:
          - histogram: { name: lat, bins: 2, bound: b }
"#;
    assert!(build(redeclared).is_err());

    let unknown = r#"
version: 1
groups:
  - counter_set_id: app
    rules:
      - histogram: { name: lat, op: reset }
"#;
    assert!(build(unknown).is_err());
}

#[test]
fn variable_kind_conflicts() {
    let bad = r#"
version: 1
range_indexes:
  - { source: t, output: bin_t, boundaries: [1, 2] }
groups:
  - counter_set_id: app
    rules:
      - counter: { name: bin_t }
"#;
    assert!(build(bad).is_err());

    let reserved = r#"
version: 1
groups:
  - counter_set_id: app
    rules:
      - counter: { name: cnt_collection }
"#;
    assert!(build(reserved).is_err());
}

#[test]
fn range_boundaries_must_increase() {
    let bad = r#"
version: 1
range_indexes:
  - { source: t, output: bin_t, boundaries: ["0.5", "0.1"] }
"#;
    assert!(build(bad).is_err());
}

#[test]
fn sample_config_compiles() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tally.yaml");
    let cfg = config::load_from_file(path).expect("sample must parse");
    assert_eq!(cfg.groups[0].rules.len(), 4);
    let model = tally_engine::model::compile(&cfg).expect("sample must compile");
    assert!(model.find_scope(&["app", "/health"]).is_some());
    assert!(model.find_scope(&["static.example.com"]).is_some());
}

#[test]
fn rules_keep_declaration_order() {
    use tally_engine::config::Rule;

    let cfg = config::load_from_str(
        r#"
version: 1
groups:
  - counter_set_id: app
    rules:
      - early_counter: { name: seen, op: inc }
      - histogram: { name: lat, bins: 2, bound: b }
      - counter: { name: hits, op: set, value: "-$n" }
    scopes:
      - name: /x
        rules:
          - histogram: { name: lat, op: reset }
"#,
    )
    .expect("must parse");

    let rules = &cfg.groups[0].rules;
    assert!(matches!(&rules[0], Rule::EarlyCounter(c) if c.name == "seen"));
    assert!(matches!(&rules[1], Rule::Histogram(h) if h.bins == Some(2)));
    assert!(matches!(&rules[2], Rule::Counter(c) if c.name == "hits"));
    assert!(matches!(&cfg.groups[0].scopes[0].rules[0], Rule::Histogram(h) if h.op.is_some()));
}

#[test]
fn zero_check_interval_is_rejected() {
    let bad = r#"
version: 1
persistent_storage:
  path: /tmp/counters.json
  check_interval: 0ms
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.class().as_str(), "CONFIG");
}

#[test]
fn range_reading_a_gate_is_rejected() {
    let bad = r#"
version: 1
range_indexes:
  - { source: inc_lat_00, output: bin, boundaries: [1] }
groups:
  - counter_set_id: app
    rules:
      - histogram: { name: lat, bins: 2, bound: bin }
"#;
    let err = build(bad).err().expect("must fail");
    assert_eq!(err.class().as_str(), "CONFIG");
}

#[test]
fn histogram_bins_cannot_exceed_range_buckets() {
    let bad = r#"
version: 1
range_indexes:
  - { source: t, output: bin_t, boundaries: [1] }
groups:
  - counter_set_id: app
    rules:
      - histogram: { name: lat, bins: 3, bound: bin_t }
"#;
    let err = build(bad).err().expect("must fail");
    assert!(err.to_string().contains("yields only 2"));

    let fits = bad.replace("bins: 3", "bins: 2");
    let e = build(&fits).expect("must build");
    assert_eq!(
        e.histogram_collection(),
        r#"{"app":{"lat":{"1":0,"+Inf":0,"sum":0,"err":0}}}"#
    );
}
