//! Scenario 1: terminal runs are never touched.

use crate::prelude::*;
use reconciler_core::{RunId, RunState};
use reconciler_store::StoreCall;

#[tokio::test]
async fn skip_terminal_run_without_writes() {
    let scenario = Scenario::new();
    scenario.seed_state(base_state(RunState::Complete));
    scenario.seed_heartbeat_age(900);

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, None);
    let writes = scenario
        .store
        .calls()
        .into_iter()
        .any(|call| matches!(call, StoreCall::Write { .. } | StoreCall::Delete { .. }));
    assert!(!writes, "terminal run must not be written to: {:?}", scenario.store.calls());
}

#[tokio::test]
async fn terminal_state_is_idempotent_across_repeated_scans() {
    let scenario = Scenario::new();
    scenario.seed_state(base_state(RunState::Failed));

    let engine = scenario.engine();
    for _ in 0..3 {
        let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");
        assert_eq!(action, None);
    }
    assert_eq!(scenario.state_record().state, Some(RunState::Failed));
}
