//! Scenarios 2-3: the two-stage stale-detection protocol's first stage,
//! the "too fresh to confirm" gate, and heartbeat recovery clearing the
//! marker.

use crate::prelude::*;
use reconciler_core::{RunId, RunState};
use reconciler_engine::Action;

#[tokio::test]
async fn first_stale_observation_records_marker() {
    let scenario = Scenario::new();
    scenario.seed_state(base_state(RunState::Running));
    scenario.seed_heartbeat_age(700);

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, Some(Action::StaleFirstObservation));
    assert!(scenario.store.contains(&scenario.key(".reconciler_stale_seen")));

    let (bytes, _) = scenario.store.get(&scenario.key(".reconciler_stale_seen")).expect("marker written");
    let marker: reconciler_core::StaleMarker = serde_json::from_slice(&bytes).expect("marker parses");
    let (heartbeat, _) = scenario.store.get(&scenario.key("heartbeat.json")).expect("heartbeat seeded");
    let heartbeat: reconciler_core::Heartbeat = serde_json::from_slice(&heartbeat).expect("heartbeat parses");
    assert_eq!(marker.heartbeat_epoch_at_observation, heartbeat.timestamp);
}

#[tokio::test]
async fn second_observation_too_fresh_takes_no_action() {
    let scenario = Scenario::new();
    scenario.seed_state(base_state(RunState::Running));
    scenario.seed_heartbeat_age(700);
    scenario.seed_marker(60, now() - chrono::Duration::seconds(700));

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, None);
    assert!(scenario.store.contains(&scenario.key(".reconciler_stale_seen")));
    assert_eq!(scenario.state_record().state, Some(RunState::Running));
}

#[tokio::test]
async fn fresh_heartbeat_clears_a_stale_marker() {
    let scenario = Scenario::new();
    scenario.seed_state(base_state(RunState::Running));
    scenario.seed_heartbeat_age(10);
    scenario.seed_marker(400, now() - chrono::Duration::seconds(900));

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, None);
    assert!(!scenario.store.contains(&scenario.key(".reconciler_stale_seen")));
}

#[tokio::test]
async fn heartbeat_advancing_between_observations_resets_the_marker() {
    let scenario = Scenario::new();
    scenario.seed_state(base_state(RunState::Running));
    scenario.seed_heartbeat_age(700);
    // Marker recorded a different (older) heartbeat epoch than the one now seeded.
    scenario.seed_marker(300, now() - chrono::Duration::seconds(1200));

    let engine = scenario.engine();
    let action = engine.reconcile_run(&RunId::new(RUN_ID)).await.expect("reconcile_run");

    assert_eq!(action, None);
    assert!(!scenario.store.contains(&scenario.key(".reconciler_stale_seen")));
}
