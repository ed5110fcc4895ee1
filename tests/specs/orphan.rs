//! Scenarios 4-6 and 12: confirming an orphan, the VM-still-alive escape
//! hatch, recovering a stuck `RESTARTING` run, and legacy bootstrap.

use crate::prelude::*;
use reconciler_core::{RunId, RunState};
use reconciler_engine::Action;

#[tokio::test]
async fn confirm_orphan_when_vm_is_gone() {
    let scenario = Scenario::new();
    scenario.seed_state(base_state(RunState::Running));
    scenario.seed_heartbeat_age(700);
    scenario.seed_marker(180, now() - chrono::Duration::seconds(700));
    // No restart_config.json and no feature flag: confirms orphan, does not restart.

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, Some(Action::Orphaned));
    assert_eq!(scenario.state_record().state, Some(RunState::Orphaned));
    assert_eq!(scenario.state_record().reason, "stale_heartbeat_vm_gone");
    assert!(!scenario.store.contains(&scenario.key(".reconciler_stale_seen")));
}

#[tokio::test]
async fn stale_but_vm_alive_does_not_orphan() {
    let scenario = Scenario::new();
    let mut state = base_state(RunState::Running);
    state.instance_name = Some("worker-1".to_string());
    state.zone = Some("us-central1-a".to_string());
    scenario.seed_state(state);
    scenario.seed_heartbeat_age(700);
    scenario.seed_marker(180, now() - chrono::Duration::seconds(700));
    scenario.compute.add_vm("test-project", "us-central1-a", "worker-1", true);

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, Some(Action::StaleVmAlive));
    assert_eq!(scenario.state_record().state, Some(RunState::Running));
}

#[tokio::test]
async fn restarting_stuck_recovers_to_orphaned_and_drops_the_lease() {
    let scenario = Scenario::new();
    let mut state = base_state(RunState::Restarting);
    state.instance_name = Some("worker-1".to_string());
    state.zone = Some("us-central1-a".to_string());
    state.updated_at = now() - chrono::Duration::seconds(700);
    scenario.seed_state(state);
    scenario.seed_heartbeat_age(700);
    scenario.store.seed(
        &scenario.key("restart.lock"),
        r#"{"actor":"reconciler","hostname":"h","acquired_at":"2026-06-15T11:00:00Z","attempt":1,"ttl_sec":300}"#,
    );
    // worker-1 does not exist in the fake compute registry: vm_exists returns false.

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, Some(Action::RestartingStuckRecovered));
    assert_eq!(scenario.state_record().state, Some(RunState::Orphaned));
    assert_eq!(scenario.state_record().reason, "restarting_stuck_recovery");
    assert!(!scenario.store.contains(&scenario.key("restart.lock")));
}

#[tokio::test]
async fn restarting_not_yet_stuck_is_left_alone() {
    let scenario = Scenario::new();
    let mut state = base_state(RunState::Restarting);
    state.updated_at = now() - chrono::Duration::seconds(30);
    scenario.seed_state(state);
    scenario.seed_heartbeat_age(10);

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, None);
    assert_eq!(scenario.state_record().state, Some(RunState::Restarting));
}

#[tokio::test]
async fn legacy_run_with_no_state_json_is_bootstrapped_as_orphaned() {
    let scenario = Scenario::new();
    scenario.seed_heartbeat_age(700);
    scenario.seed_marker(180, now() - chrono::Duration::seconds(700));

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, Some(Action::Orphaned));
    assert!(scenario.store.contains(&scenario.key("state.json")));
    let state = scenario.state_record();
    assert_eq!(state.state, Some(RunState::Orphaned));
    assert_eq!(state.updated_by, "reconciler");
}

#[tokio::test]
async fn preempted_run_confirmed_orphan_is_logged_only() {
    let scenario = Scenario::new();
    scenario.seed_state(base_state(RunState::Preempted));
    scenario.seed_heartbeat_age(700);
    scenario.seed_marker(180, now() - chrono::Duration::seconds(700));

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, Some(Action::PreemptedConfirmed));
    assert_eq!(scenario.state_record().state, Some(RunState::Preempted));
}
