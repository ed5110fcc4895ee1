//! Scenarios 9-11 and 13-15: the restart executor exercised through the
//! full `reconcile_run` path (stale heartbeat confirms the orphan, which
//! then hands off to the restart executor), matching how these preconditions
//! actually arise in production rather than calling the executor directly.

use crate::prelude::*;
use reconciler_core::{RunId, RunState};
use reconciler_engine::Action;

/// Seeds a run that `reconcile_run` will confirm orphaned on this call:
/// stale heartbeat, a second-stage marker old enough and matching.
fn seed_confirmable_orphan(scenario: &Scenario) {
    scenario.seed_state(base_state(RunState::Running));
    scenario.seed_heartbeat_age(700);
    scenario.seed_marker(180, now() - chrono::Duration::seconds(700));
}

#[tokio::test]
async fn restart_blocked_by_stop_sentinel() {
    let scenario = Scenario::new();
    seed_confirmable_orphan(&scenario);
    scenario.enable_restarts();
    scenario.seed_restart_config(3, &["us-central1-a"]);
    scenario.store.seed(&scenario.key(".stop"), "");

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, Some(Action::Orphaned));
    assert_eq!(scenario.state_record().state, Some(RunState::Orphaned));
    assert_eq!(scenario.compute.instance_count(), 0);
}

#[tokio::test]
async fn restart_disabled_globally_leaves_run_orphaned() {
    let scenario = Scenario::new();
    seed_confirmable_orphan(&scenario);
    scenario.seed_restart_config(3, &["us-central1-a"]);
    // No .reconciler_restart_enabled flag written.

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, Some(Action::Orphaned));
    assert_eq!(scenario.state_record().state, Some(RunState::Orphaned));
    assert_eq!(scenario.compute.instance_count(), 0);
}

#[tokio::test]
async fn owner_lock_abort_leaves_state_orphaned_and_releases_lease() {
    let scenario = Scenario::new();
    let mut state = base_state(RunState::Running);
    state.instance_name = None;
    scenario.seed_state(state);
    scenario.seed_heartbeat_age(700);
    scenario.seed_marker(180, now() - chrono::Duration::seconds(700));
    scenario.enable_restarts();
    scenario.seed_restart_config(3, &["us-central1-a"]);
    scenario.store.seed_json(
        &scenario.key(".owner.lock"),
        &reconciler_core::OwnerLock {
            instance: "old-worker".to_string(),
            zone: "us-central1-a".to_string(),
        },
    );
    scenario.compute.add_vm("test-project", "us-central1-a", "old-worker", true);

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, Some(Action::RestartFailed));
    assert_eq!(scenario.state_record().state, Some(RunState::Orphaned));
    assert!(!scenario.store.contains(&scenario.key("restart.lock")));
}

#[tokio::test]
async fn successful_restart_provisions_a_replacement_instance() {
    let scenario = Scenario::new();
    seed_confirmable_orphan(&scenario);
    scenario.enable_restarts();
    scenario.seed_restart_config(3, &["us-central1-a", "us-central1-b"]);

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, Some(Action::Restarted));
    assert_eq!(scenario.state_record().state, Some(RunState::Restarting));
    assert_eq!(scenario.compute.instance_count(), 1);
    assert!(!scenario.store.contains(&scenario.key("restart.lock")));
}

#[tokio::test]
async fn restart_exhausted_attempts_leaves_run_orphaned() {
    let scenario = Scenario::new();
    let mut state = base_state(RunState::Running);
    state.attempt = 3;
    scenario.seed_state(state);
    scenario.seed_heartbeat_age(700);
    scenario.seed_marker(180, now() - chrono::Duration::seconds(700));
    scenario.enable_restarts();
    scenario.seed_restart_config(3, &["us-central1-a"]);

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, Some(Action::Orphaned));
    assert_eq!(scenario.state_record().attempt, 3);
    assert!(!scenario.store.contains(&scenario.key("restart.lock")));
}

#[tokio::test]
async fn all_fallback_zones_failing_rolls_back_to_orphaned() {
    let scenario = Scenario::new();
    seed_confirmable_orphan(&scenario);
    scenario.enable_restarts();
    scenario.seed_restart_config(3, &["us-central1-a", "us-central1-b"]);
    scenario.compute.fail_create_in_zone("us-central1-a", "quota exceeded");
    scenario.compute.fail_create_in_zone("us-central1-b", "quota exceeded");

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, Some(Action::RestartFailed));
    assert_eq!(scenario.state_record().state, Some(RunState::Orphaned));
    assert_eq!(scenario.state_record().reason, "restart_rollback");
    assert!(!scenario.store.contains(&scenario.key("restart.lock")));
    assert!(scenario.notify.calls().iter().any(|c| c.message.contains("Restart failed")));
}
