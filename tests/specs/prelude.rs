//! Shared scaffolding for the end-to-end reconciler scenarios.
//!
//! Builds a real `ReconcileEngine` wired to the in-memory fakes so each
//! scenario exercises the full crate boundary (core → store → compute →
//! notify → engine) rather than a single crate's internal view.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use chrono::{DateTime, Utc};
use reconciler_compute::FakeComputeAdapter;
use reconciler_core::{FakeClock, Heartbeat, RestartConfig, StaleMarker, StateRecord};
use reconciler_engine::{EngineConfig, ReconcileEngine};
use reconciler_notify::FakeNotifyAdapter;
use reconciler_store::FakeStoreAdapter;

pub type TestEngine = ReconcileEngine<FakeStoreAdapter, FakeComputeAdapter, FakeNotifyAdapter, FakeClock>;

pub const RUN_ID: &str = "training-run-42";

/// Fixed wall clock all scenarios anchor their "N seconds ago" math to.
pub fn now() -> DateTime<Utc> {
    "2026-06-15T12:00:00Z".parse().unwrap()
}

pub struct Scenario {
    pub store: FakeStoreAdapter,
    pub compute: FakeComputeAdapter,
    pub notify: FakeNotifyAdapter,
    pub clock: FakeClock,
}

impl Scenario {
    pub fn new() -> Self {
        Self {
            store: FakeStoreAdapter::new(),
            compute: FakeComputeAdapter::new(),
            notify: FakeNotifyAdapter::new(),
            clock: FakeClock::new(now()),
        }
    }

    pub fn engine(&self) -> TestEngine {
        self.engine_with_config(EngineConfig::default())
    }

    pub fn engine_with_config(&self, config: EngineConfig) -> TestEngine {
        ReconcileEngine::new(
            self.store.clone(),
            self.compute.clone(),
            self.notify.clone(),
            reconciler_core::TransitionTable::load(),
            self.clock.clone(),
            config,
        )
    }

    pub fn key(&self, suffix: &str) -> String {
        format!("runs/{RUN_ID}/{suffix}")
    }

    pub fn seed_state(&self, state: StateRecord) {
        self.store.seed_json(&self.key("state.json"), &state);
    }

    pub fn seed_heartbeat_age(&self, age_sec: i64) {
        self.store.seed_json(
            &self.key("heartbeat.json"),
            &Heartbeat {
                timestamp: now() - chrono::Duration::seconds(age_sec),
                phase: None,
                uptime_sec: None,
                exit_code: None,
            },
        );
    }

    pub fn seed_marker(&self, marker_age_sec: i64, heartbeat_epoch: DateTime<Utc>) {
        self.store.seed_json(
            &self.key(".reconciler_stale_seen"),
            &StaleMarker {
                timestamp: now() - chrono::Duration::seconds(marker_age_sec),
                heartbeat_epoch_at_observation: heartbeat_epoch,
            },
        );
    }

    pub fn enable_restarts(&self) {
        self.store.seed(".reconciler_restart_enabled", r#"{"enabled_at":"2025-01-01T00:00:00Z"}"#);
    }

    pub fn seed_restart_config(&self, auto_restart_max: u32, fallback_zones: &[&str]) {
        self.store.seed_json(
            &self.key("restart_config.json"),
            &RestartConfig {
                image: "cos-stable".to_string(),
                machine_type: "n1-standard-8".to_string(),
                fallback_zones: fallback_zones.iter().map(|z| z.to_string()).collect(),
                service_account: "sa@project.iam.gserviceaccount.com".to_string(),
                container_name: "spot-runner".to_string(),
                job_command: "python train.py".to_string(),
                conda_env: None,
                notify_secret: None,
                startup_script: None,
                metadata_prefix: None,
                gpu_enabled: false,
                gpu_type: None,
                gpu_count: None,
                install_nvidia_driver: false,
                auto_restart_max,
            },
        );
    }

    pub fn state_record(&self) -> StateRecord {
        let (bytes, _) = self.store.get(&self.key("state.json")).expect("state.json must exist");
        serde_json::from_slice(&bytes).expect("state.json must parse")
    }
}

pub fn base_state(state: reconciler_core::RunState) -> StateRecord {
    StateRecord {
        state: Some(state),
        updated_at: now() - chrono::Duration::seconds(900),
        updated_by: "reconciler".to_string(),
        reason: "seed".to_string(),
        ..StateRecord::absent()
    }
}
