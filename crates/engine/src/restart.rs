// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The restart executor: acquires the restart lease, clears the
//! worker's owner lock, transitions to `RESTARTING`, provisions a
//! replacement instance across the configured fallback zones, and releases
//! the lease. Any failure after the lease is acquired rolls the run's state
//! back and always releases the lease — a stale lease is the one outcome
//! this module must never leave behind.

use crate::action::Action;
use crate::cas_writer::CasWriter;
use crate::config::EngineConfig;
use crate::error::EngineError;
use reconciler_compute::ComputeAdapter;
use reconciler_core::{ActorClass, Clock, RestartConfig, RestartLock, RunId, RunState, StateRecord, TransitionTable};
use reconciler_notify::NotifyAdapter;
use reconciler_store::{StoreAdapter, StoreError};

const RESTART_LOCK_TTL_SEC: u64 = 300;

/// Restart lease + owner-lock + provisioning protocol, scoped to one run.
pub struct RestartExecutor<S, C, N, CL> {
    store: S,
    compute: C,
    notify: N,
    transitions: TransitionTable,
    clock: CL,
    config: EngineConfig,
}

impl<S, C, N, CL> RestartExecutor<S, C, N, CL>
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

    /// Checks the bucket-global `.reconciler_restart_enabled` feature flag:
    /// present, parses as an object, and carries a non-null `enabled_at`.
    async fn restart_enabled(&self) -> bool {
        match self.store.read_text(".reconciler_restart_enabled").await {
            Ok(Some((text, _))) => match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) => !value.get("enabled_at").map(|v| v.is_null()).unwrap_or(true),
                Err(_) => false,
            },
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read restart feature flag, treating as disabled");
                false
            }
        }
    }

    /// Attempts to restart `run_id` after it has been confirmed orphaned or
    /// preempted. Returns `None` if any precondition fails, without side
    /// effects.
    pub async fn try_restart(
        &self,
        run_id: &RunId,
        state: &StateRecord,
        restart_config: Option<&RestartConfig>,
    ) -> Result<Option<Action>, EngineError> {
        if !self.restart_enabled().await {
            tracing::info!(run_id = %run_id, "restart not enabled, missing .reconciler_restart_enabled");
            return Ok(None);
        }

        let Some(restart_config) = restart_config else {
            tracing::info!(run_id = %run_id, "no restart_config.json, cannot restart");
            return Ok(None);
        };

        if !matches!(state.state, Some(RunState::Preempted) | Some(RunState::Orphaned)) {
            return Ok(None);
        }

        if state.attempt >= restart_config.auto_restart_max {
            tracing::info!(run_id = %run_id, attempt = state.attempt, max = restart_config.auto_restart_max, "restart attempts exhausted");
            return Ok(None);
        }

        let stop_key = format!("{}.stop", run_id.key_prefix());
        if self.store.exists(&stop_key).await? {
            tracing::info!(run_id = %run_id, "stop sentinel present, skipping restart");
            return Ok(None);
        }

        let new_attempt = state.attempt + 1;

        if self.config.dry_run {
            tracing::info!(run_id = %run_id, attempt = new_attempt, "dry-run: would attempt restart");
            let _ = self
                .notify
                .notify(
                    "reconciler",
                    &format!("[DRY-RUN] [{run_id}] Would restart (attempt {new_attempt}/{}).", restart_config.auto_restart_max),
                )
                .await;
            return Ok(Some(Action::WouldRestart));
        }

        tracing::info!(run_id = %run_id, attempt = new_attempt, max = restart_config.auto_restart_max, "attempting restart");

        let lock_key = format!("{}restart.lock", run_id.key_prefix());
        let Some(lock_generation) = self.acquire_restart_lease(&lock_key, new_attempt).await? else {
            tracing::info!(run_id = %run_id, "could not acquire restart lease");
            return Ok(None);
        };

        match self.run_protocol(run_id, state, restart_config, new_attempt).await {
            Ok(action) => {
                self.release_lease(&lock_key, lock_generation).await;
                Ok(Some(action))
            }
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "restart failed, rolling back");
                let prev = state.state.unwrap_or(RunState::Orphaned);
                if let Err(rollback_err) = self.cas_writer().write_state(run_id, prev, "restart_rollback", ActorClass::Reconciler).await {
                    tracing::error!(run_id = %run_id, error = %rollback_err, "restart rollback write failed");
                }
                self.release_lease(&lock_key, lock_generation).await;
                let _ = self.notify.notify("reconciler", &format!("ERROR: [{run_id}] Restart failed: {e}")).await;
                Ok(Some(Action::RestartFailed))
            }
        }
    }

    /// Runs steps 2-4 of the protocol; step 1 (lease acquisition) and step 5
    /// (lease release) bracket this call in `try_restart` since both the
    /// success and failure paths must release the lease exactly once.
    async fn run_protocol(
        &self,
        run_id: &RunId,
        state: &StateRecord,
        restart_config: &RestartConfig,
        attempt: u32,
    ) -> Result<Action, EngineError> {
        self.clear_owner_lock(run_id).await?;

        let outcome = self
            .cas_writer()
            .write_state(run_id, RunState::Restarting, "reconciler_restart", ActorClass::Reconciler)
            .await?;
        if !outcome.is_accepted() {
            return Err(EngineError::RestartAborted("transition to RESTARTING was rejected".to_string()));
        }

        let zones: Vec<String> = if restart_config.fallback_zones.is_empty() {
            state.zone.clone().into_iter().collect()
        } else {
            restart_config.fallback_zones.clone()
        };

        let spec = reconciler_compute::build_instance_spec(restart_config, run_id, &self.config.bucket, attempt);
        let mut created_in = None;
        for zone in &zones {
            match self.compute.create_instance(&self.config.project, zone, &spec).await {
                Ok(name) => {
                    created_in = Some((name, zone.clone()));
                    break;
                }
                Err(e) => {
                    tracing::warn!(run_id = %run_id, zone, error = %e, "zone failed, trying next");
                }
            }
        }

        let Some((vm_name, zone)) = created_in else {
            return Err(EngineError::RestartAborted("all fallback zones failed".to_string()));
        };

        let _ = self
            .notify
            .notify(
                "reconciler",
                &format!("INFO: [{run_id}] Restarted as {vm_name} in {zone} (attempt {attempt}/{}).", restart_config.auto_restart_max),
            )
            .await;
        tracing::info!(run_id = %run_id, vm_name, zone, "restart successful");
        Ok(Action::Restarted)
    }

    /// Step 1: CAS-create `restart.lock`, reclaiming an expired lease via
    /// delete-then-recreate when the existing one is past its TTL.
    async fn acquire_restart_lease(&self, lock_key: &str, attempt: u32) -> Result<Option<u64>, EngineError> {
        let payload = RestartLock {
            actor: "reconciler".to_string(),
            hostname: self.config.hostname.clone(),
            acquired_at: self.clock.now(),
            attempt,
            ttl_sec: RESTART_LOCK_TTL_SEC,
        };

        match self.store.write_json(lock_key, &payload, 0).await {
            Ok(generation) => Ok(Some(generation)),
            Err(StoreError::PreconditionFailed { .. }) => self.reclaim_stale_lease(lock_key, &payload).await,
            Err(e) => Err(e.into()),
        }
    }

    async fn reclaim_stale_lease(&self, lock_key: &str, payload: &RestartLock) -> Result<Option<u64>, EngineError> {
        let Some((existing, generation)) = self.store.read_json::<RestartLock>(lock_key).await? else {
            return Ok(None);
        };

        let age = (self.clock.now() - existing.acquired_at).num_seconds();
        if age <= existing.ttl_sec as i64 {
            return Ok(None);
        }

        if let Err(e) = self.store.delete(lock_key, generation).await {
            tracing::info!(lock_key, error = %e, "stale restart lease reclaim lost the race");
            return Ok(None);
        }

        match self.store.write_json(lock_key, payload, 0).await {
            Ok(new_generation) => {
                tracing::info!(lock_key, age, "reclaimed stale restart lease");
                Ok(Some(new_generation))
            }
            Err(StoreError::PreconditionFailed { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn release_lease(&self, lock_key: &str, generation: u64) {
        if let Err(e) = self.store.delete(lock_key, generation).await {
            tracing::warn!(lock_key, error = %e, "preconditioned lease release failed, forcing unconditional delete");
            if let Ok(Some((_, current_generation))) = self.store.read_text(lock_key).await {
                let _ = self.store.delete(lock_key, current_generation).await;
            }
        }
    }

    /// Step 2: verify the owner instance is gone, then preconditioned-delete
    /// `.owner.lock`. Aborts the whole restart if the owner is still alive.
    async fn clear_owner_lock(&self, run_id: &RunId) -> Result<(), EngineError> {
        let key = format!("{}.owner.lock", run_id.key_prefix());
        let Some((owner, generation)) = self.store.read_json::<reconciler_core::OwnerLock>(&key).await? else {
            return Ok(());
        };

        if self.compute.vm_exists(&self.config.project, &owner.zone, &owner.instance).await {
            tracing::error!(run_id = %run_id, instance = owner.instance, "owner vm still exists, aborting restart");
            return Err(EngineError::RestartAborted(format!("owner vm {} still exists", owner.instance)));
        }

        self.store.delete(&key, generation).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "restart_tests.rs"]
mod tests;
