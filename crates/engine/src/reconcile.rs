// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reconciliation engine: the per-run decision tree, evaluated in
//! a fixed order, and the top-level scan that drives it across every
//! discovered run. Nothing here mutates `state.json` directly — every
//! transition goes through [`crate::cas_writer::CasWriter`].

use crate::action::Action;
use crate::cas_writer::CasWriter;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::restart::RestartExecutor;
use reconciler_compute::ComputeAdapter;
use reconciler_core::{ActorClass, Clock, Heartbeat, RestartConfig, RunId, RunState, StaleMarker, StateRecord, TransitionTable};
use reconciler_notify::NotifyAdapter;
use reconciler_store::StoreAdapter;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Legacy fallback for instance location when `state.json` lacks it.
#[derive(Debug, Deserialize, Default)]
struct RunManifest {
    #[serde(default)]
    instance: Option<String>,
    #[serde(default)]
    zone: Option<String>,
}

/// Drives `reconcile_run` across every discovered run and never aborts the
/// scan on a single run's error.
pub struct ReconcileEngine<S, C, N, CL> {
    store: S,
    compute: C,
    notify: N,
    transitions: TransitionTable,
    clock: CL,
    config: EngineConfig,
}

impl<S, C, N, CL> ReconcileEngine<S, C, N, CL>
where
    S: StoreAdapter,
    C: ComputeAdapter,
    N: NotifyAdapter,
    CL: Clock,
{
    pub fn new(store: S, compute: C, notify: N, transitions: TransitionTable, clock: CL, config: EngineConfig) -> Self {
        Self {
            store,
            compute,
            notify,
            transitions,
            clock,
            config,
        }
    }

    fn cas_writer(&self) -> CasWriter<S, CL> {
        CasWriter::new(self.store.clone(), self.transitions.clone(), self.clock.clone(), self.config.dry_run)
    }

    /// Deletes `key` without a caller-known generation, for objects that
    /// carry no safety invariant (markers, stale locks). Reads the current
    /// generation first; a concurrent delete racing us is not an error.
    async fn delete_best_effort(&self, key: &str) {
        match self.store.read_text(key).await {
            Ok(Some((_, generation))) => {
                if let Err(e) = self.store.delete(key, generation).await {
                    tracing::warn!(key, error = %e, "best-effort delete failed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key, error = %e, "best-effort delete read failed"),
        }
    }

    fn restart_executor(&self) -> RestartExecutor<S, C, N, CL> {
        RestartExecutor::new(
            self.store.clone(),
            self.compute.clone(),
            self.notify.clone(),
            self.transitions.clone(),
            self.clock.clone(),
            self.config.clone(),
        )
    }

    /// Lists every run under `runs/` and reconciles each in sorted order,
    /// logging and skipping any run whose reconciliation errors.
    pub async fn reconcile_all(&self) -> Result<BTreeMap<String, Action>, EngineError> {
        tracing::info!(
            dry_run = self.config.dry_run,
            project = %self.config.project,
            bucket = %self.config.bucket,
            transitions_hash = %self.transitions.transitions_hash(),
            "reconciler starting"
        );

        let mut run_ids = self.store.list_run_ids("runs/").await?;
        run_ids.sort();
        tracing::info!(count = run_ids.len(), "discovered runs");

        let mut actions = BTreeMap::new();
        for run_id in run_ids {
            match self.reconcile_run(&run_id).await {
                Ok(Some(action)) => {
                    actions.insert(run_id.as_str().to_string(), action);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(run_id = %run_id, error = %e, "error reconciling run");
                }
            }
        }

        tracing::info!(actions = actions.len(), "reconciliation complete");
        for (run_id, action) in &actions {
            tracing::info!(run_id, %action, "action taken");
        }
        Ok(actions)
    }

    /// The per-run decision tree, evaluated in a fixed order.
    pub async fn reconcile_run(&self, run_id: &RunId) -> Result<Option<Action>, EngineError> {
        let prefix = run_id.key_prefix();
        let state = self.store.read_json::<StateRecord>(&format!("{prefix}state.json")).await?;
        let heartbeat = self.store.read_json::<Heartbeat>(&format!("{prefix}heartbeat.json")).await?;
        let restart_config = self.store.read_json::<RestartConfig>(&format!("{prefix}restart_config.json")).await?;

        let state_record = state.as_ref().map(|(s, _)| s.clone());

        // 1. Terminal short-circuit.
        if let Some(record) = &state_record {
            if record.is_terminal() {
                return Ok(None);
            }
        }

        // 2. Drift repair.
        if let Some(record) = &state_record {
            if record.state.is_some() && record.state != Some(RunState::Restarting) {
                self.repair_status_drift(run_id, record).await?;
            }
        }

        // 3. RESTARTING stuck recovery.
        if let Some(record) = &state_record {
            if record.state == Some(RunState::Restarting) {
                return self.recover_stuck_restarting(run_id, record, heartbeat.as_ref().map(|(h, _)| h)).await;
            }
        }

        // 4. No heartbeat yet.
        let Some((heartbeat, _)) = heartbeat else {
            return Ok(None);
        };

        let now = self.clock.now();
        let hb_age = now - heartbeat.timestamp;
        let marker_key = format!("{prefix}.reconciler_stale_seen");

        // 5. Fresh heartbeat.
        if hb_age < self.config.heartbeat_stale() {
            if self.store.exists(&marker_key).await? {
                if !self.config.dry_run {
                    self.delete_best_effort(&marker_key).await;
                }
                tracing::info!(run_id = %run_id, "heartbeat recovered, cleared stale marker");
            }
            return Ok(None);
        }

        // Heartbeat is stale.
        let marker = self.store.read_json::<StaleMarker>(&marker_key).await?;

        // 6. First stale observation.
        let Some((marker, _)) = marker else {
            let marker = StaleMarker {
                timestamp: now,
                heartbeat_epoch_at_observation: heartbeat.timestamp,
            };
            if !self.config.dry_run {
                if let Err(e) = self.store.write_json(&marker_key, &marker, 0).await {
                    tracing::error!(run_id = %run_id, error = %e, "failed to write stale marker");
                }
            }
            tracing::info!(run_id = %run_id, hb_age_sec = hb_age.num_seconds(), "first stale observation");
            let _ = self
                .notify
                .notify(
                    "reconciler",
                    &format!("INFO: [{run_id}] Heartbeat stale ({}s). First observation recorded.", hb_age.num_seconds()),
                )
                .await;
            return Ok(Some(Action::StaleFirstObservation));
        };

        // 7. Second observation gate.
        let marker_age = now - marker.timestamp;
        if marker_age < self.config.stale_marker_min_age() {
            tracing::info!(run_id = %run_id, marker_age_sec = marker_age.num_seconds(), "stale marker too fresh");
            return Ok(None);
        }

        if marker.heartbeat_epoch_at_observation != heartbeat.timestamp {
            tracing::info!(run_id = %run_id, "heartbeat changed since marker, resetting marker");
            if !self.config.dry_run {
                self.delete_best_effort(&marker_key).await;
            }
            return Ok(None);
        }

        // 8. VM liveness check.
        let (instance_name, zone) = self.resolve_instance_location(run_id, state_record.as_ref()).await?;
        if let (Some(name), Some(zone)) = (&instance_name, &zone) {
            if self.compute.vm_exists(&self.config.project, zone, name).await {
                tracing::warn!(run_id = %run_id, instance = %name, "vm still exists despite stale heartbeat");
                let _ = self
                    .notify
                    .notify(
                        "reconciler",
                        &format!("WARN: [{run_id}] Heartbeat stale ({}s) but VM {name} still exists.", hb_age.num_seconds()),
                    )
                    .await;
                return Ok(Some(Action::StaleVmAlive));
            }
        } else if let Some(found) = self.compute.vm_search_by_pattern(&self.config.project, run_id.as_str()).await? {
            tracing::warn!(run_id = %run_id, instance = %found.name, zone = %found.zone, "found vm via pattern search");
            return Ok(Some(Action::StaleVmFoundByPattern));
        }

        // 9. Confirmed orphan.
        self.confirm_orphan(run_id, state_record.as_ref(), restart_config.as_ref().map(|(c, _)| c), &marker_key, &instance_name, hb_age)
            .await
    }

    async fn repair_status_drift(&self, run_id: &RunId, record: &StateRecord) -> Result<(), EngineError> {
        let disabled_key = format!("{}.drift_repair_disabled", run_id.key_prefix());
        if self.store.exists(&disabled_key).await? {
            return Ok(());
        }

        let status_key = format!("{}status.txt", run_id.key_prefix());
        let Some((current, generation)) = self.store.read_text(&status_key).await? else {
            return Ok(());
        };

        let Some(state) = record.state else { return Ok(()) };
        let expected = reconciler_core::status_compat(state);
        if current.trim() != expected {
            if self.config.dry_run {
                tracing::info!(run_id = %run_id, current = current.trim(), expected, "dry-run: would repair status drift");
                return Ok(());
            }
            if let Err(e) = self.store.write(&status_key, expected.as_bytes().to_vec(), generation).await {
                tracing::warn!(run_id = %run_id, error = %e, "status drift repair write failed");
            } else {
                tracing::info!(run_id = %run_id, from = current.trim(), to = expected, "repaired status drift");
            }
        }
        Ok(())
    }

    async fn recover_stuck_restarting(
        &self,
        run_id: &RunId,
        record: &StateRecord,
        heartbeat: Option<&Heartbeat>,
    ) -> Result<Option<Action>, EngineError> {
        let now = self.clock.now();
        let age = now - record.updated_at;
        if age <= self.config.restarting_stuck() {
            return Ok(None);
        }

        let vm_alive = match (&record.instance_name, &record.zone) {
            (Some(name), Some(zone)) => self.compute.vm_exists(&self.config.project, zone, name).await,
            _ => false,
        };
        let hb_fresh = heartbeat.map(|h| now - h.timestamp < self.config.heartbeat_stale()).unwrap_or(false);

        if vm_alive || hb_fresh {
            return Ok(None);
        }

        tracing::warn!(run_id = %run_id, age_sec = age.num_seconds(), "restarting stuck, recovering to orphaned");
        self.cas_writer()
            .write_state(run_id, RunState::Orphaned, "restarting_stuck_recovery", ActorClass::Reconciler)
            .await?;

        if !self.config.dry_run {
            let lock_key = format!("{}restart.lock", run_id.key_prefix());
            if let Ok(Some((_, generation))) = self.store.read_text(&lock_key).await {
                self.store.delete(&lock_key, generation).await.ok();
            }
        }

        let _ = self
            .notify
            .notify(
                "reconciler",
                &format!("WARN: [{run_id}] RESTARTING stuck for {}s. Recovered to ORPHANED.", age.num_seconds()),
            )
            .await;

        Ok(Some(Action::RestartingStuckRecovered))
    }

    /// Resolves `(instance_name, zone)` from `state.json`, falling back to
    /// legacy `run_manifest.json` if either is absent.
    async fn resolve_instance_location(
        &self,
        run_id: &RunId,
        state: Option<&StateRecord>,
    ) -> Result<(Option<String>, Option<String>), EngineError> {
        let mut instance_name = state.and_then(|s| s.instance_name.clone());
        let mut zone = state.and_then(|s| s.zone.clone());

        if instance_name.is_none() || zone.is_none() {
            let manifest_key = format!("{}run_manifest.json", run_id.key_prefix());
            if let Some((manifest, _)) = self.store.read_json::<RunManifest>(&manifest_key).await? {
                instance_name = instance_name.or(manifest.instance);
                zone = zone.or(manifest.zone);
            }
        }

        Ok((instance_name, zone))
    }

    async fn confirm_orphan(
        &self,
        run_id: &RunId,
        state: Option<&StateRecord>,
        restart_config: Option<&RestartConfig>,
        marker_key: &str,
        instance_name: &Option<String>,
        hb_age: chrono::Duration,
    ) -> Result<Option<Action>, EngineError> {
        if let Some(record) = state {
            if record.state == Some(RunState::Preempted) {
                tracing::info!(run_id = %run_id, "already preempted, confirmed by reconciler");
                let _ = self
                    .notify
                    .notify("reconciler", &format!("INFO: [{run_id}] Confirmed PREEMPTED (stale heartbeat + VM gone)."))
                    .await;
                return Ok(Some(Action::PreemptedConfirmed));
            }
        }

        let orphaned_record = if let Some(record) = state {
            self.cas_writer()
                .write_state(run_id, RunState::Orphaned, "stale_heartbeat_vm_gone", ActorClass::Reconciler)
                .await?;
            record.clone()
        } else {
            self.cas_writer()
                .write_state(run_id, RunState::Orphaned, "legacy_bootstrap_orphaned", ActorClass::Reconciler)
                .await?;
            tracing::info!(run_id = %run_id, "legacy run bootstrapped as orphaned");
            StateRecord::absent()
        };

        let _ = self
            .notify
            .notify(
                "reconciler",
                &format!(
                    "WARN: [{run_id}] ORPHANED — heartbeat stale ({}s), VM gone. Instance: {}",
                    hb_age.num_seconds(),
                    instance_name.as_deref().unwrap_or("unknown")
                ),
            )
            .await;

        if !self.config.dry_run {
            self.delete_best_effort(marker_key).await;
        }

        let mut effective = orphaned_record;
        effective.state = Some(RunState::Orphaned);
        if let Some(action) = self.restart_executor().try_restart(run_id, &effective, restart_config).await? {
            return Ok(Some(action));
        }

        Ok(Some(Action::Orphaned))
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
