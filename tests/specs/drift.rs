//! Scenarios 7-8: drift repair of `status.txt` and its disable sentinel.
//!
//! Drift repair (step 2 of the decision tree) only runs for non-terminal
//! runs — a terminal run is already caught by the short-circuit in step 1 —
//! so these scenarios seed a non-terminal state with a fresh heartbeat, the
//! same fixture shape the engine's own unit tests use.

use crate::prelude::*;
use reconciler_core::RunId;
use reconciler_core::RunState;

#[tokio::test]
async fn drift_repair_rewrites_status_txt() {
    let scenario = Scenario::new();
    scenario.seed_state(base_state(RunState::Running));
    scenario.seed_heartbeat_age(5);
    scenario.store.seed(&scenario.key("status.txt"), "FAILED");

    let engine = scenario.engine();
    let _ = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(scenario.store.get_text(&scenario.key("status.txt")), Some("RUNNING".to_string()));
}

#[tokio::test]
async fn drift_repair_suppressed_when_disabled() {
    let scenario = Scenario::new();
    scenario.seed_state(base_state(RunState::Running));
    scenario.seed_heartbeat_age(5);
    scenario.store.seed(&scenario.key("status.txt"), "FAILED");
    scenario.store.seed(&scenario.key(".drift_repair_disabled"), "");

    let engine = scenario.engine();
    let _ = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(scenario.store.get_text(&scenario.key("status.txt")), Some("FAILED".to_string()));
}

#[tokio::test]
async fn drift_repair_tolerated_during_restarting() {
    let scenario = Scenario::new();
    let mut state = base_state(RunState::Restarting);
    state.updated_at = now() - chrono::Duration::seconds(10);
    scenario.seed_state(state);
    scenario.seed_heartbeat_age(10);
    scenario.store.seed(&scenario.key("status.txt"), "ORPHANED");

    let engine = scenario.engine();
    let _ = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    // Drift repair is skipped while RESTARTING, so the stale projection is
    // left untouched rather than rewritten to "RUNNING".
    assert_eq!(scenario.store.get_text(&scenario.key("status.txt")), Some("ORPHANED".to_string()));
}
