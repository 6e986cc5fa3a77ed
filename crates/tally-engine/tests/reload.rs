#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use tally_engine::model::SetId;
use tally_engine::state::{now_ms, Uptime};
use tally_engine::store::SharedMemory;
use tally_engine::{config, Engine, NoHostVars, Phase, ProcessState};

fn generation(process: &Arc<ProcessState>, yaml: &str) -> Engine {
    let cfg = config::load_from_str(yaml).expect("config must parse");
    Engine::new(cfg, Arc::clone(process)).expect("engine must build")
}

fn counters(survive: bool, names: &[&str]) -> String {
    let mut yaml = format!("version: 1\nsurvive_reload: {survive}\ngroups:\n  - counter_set_id: app\n    rules:\n");
    for n in names {
        yaml.push_str(&format!("      - counter: {{ name: {n}, op: inc }}\n"));
    }
    yaml
}

fn bump(e: &Engine, times: usize) {
    let root = e.find_scope(&["app"]).unwrap();
    for _ in 0..times {
        e.apply(root, Phase::Late, &NoHostVars);
    }
}

#[test]
fn growth_keeps_old_values_at_old_indices() {
    let process = Arc::new(ProcessState::new());
    let g1 = generation(&process, &counters(false, &["a", "b"]));
    bump(&g1, 3);

    let g2 = generation(&process, &counters(false, &["a", "b", "c"]));
    let store = g2.set_store(SetId(0)).unwrap();
    assert_eq!(store.region().live(), 3);
    assert_eq!(g2.collection(), r#"{"app":{"a":3,"b":3,"c":0}}"#);
    assert_eq!(process.shm.zone_count(), 1);
}

#[test]
fn survive_reload_with_same_size_keeps_values() {
    let process = Arc::new(ProcessState::new());
    let g1 = generation(&process, &counters(true, &["a", "b"]));
    bump(&g1, 4);

    let g2 = generation(&process, &counters(true, &["a", "b"]));
    assert_eq!(g2.counter_value("app", "a"), Some(4));
    assert!(Arc::ptr_eq(
        g1.set_store(SetId(0)).unwrap().region(),
        g2.set_store(SetId(0)).unwrap().region()
    ));
}

#[test]
fn reload_without_survive_zeroes_in_place() {
    let process = Arc::new(ProcessState::new());
    let g1 = generation(&process, &counters(false, &["a", "b"]));
    bump(&g1, 2);

    let g2 = generation(&process, &counters(false, &["a"]));
    assert_eq!(g2.collection(), r#"{"app":{"a":0}}"#);
    assert_eq!(g2.set_store(SetId(0)).unwrap().region().live(), 1);
}

#[test]
fn survive_with_changed_size_does_not_survive_on_shrink() {
    let process = Arc::new(ProcessState::new());
    let g1 = generation(&process, &counters(true, &["a", "b"]));
    bump(&g1, 2);

    let g2 = generation(&process, &counters(true, &["a"]));
    assert_eq!(g2.counter_value("app", "a"), Some(0));
}

#[test]
fn stale_generation_writes_are_lost_after_growth() {
    let process = Arc::new(ProcessState::new());
    let g1 = generation(&process, &counters(false, &["a"]));
    bump(&g1, 1);

    let g2 = generation(&process, &counters(false, &["a", "b"]));
    assert!(!g1.set_store(SetId(0)).unwrap().is_current());
    assert!(g2.set_store(SetId(0)).unwrap().is_current());

    // a worker still running the old generation updates the retired region
    bump(&g1, 5);
    assert_eq!(g1.counter_value("app", "a"), Some(6));
    assert_eq!(g2.counter_value("app", "a"), Some(1));
}

#[test]
fn new_generation_resets_uptime_reload_only() {
    let process = Arc::new(ProcessState {
        shm: SharedMemory::new(),
        uptime: Uptime::at(now_ms() - 120_000),
    });
    let e = generation(&process, &counters(false, &["a"]));
    let root = e.find_scope(&["app"]).unwrap();

    let since_start: u64 = e.get_var(root, "cnt_uptime", &NoHostVars).text.parse().unwrap();
    let since_reload: u64 = e.get_var(root, "cnt_uptime_reload", &NoHostVars).text.parse().unwrap();
    assert!(since_start >= 120);
    assert!(since_reload < 60);
}
