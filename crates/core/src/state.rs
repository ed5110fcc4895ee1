// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-contract record types for the objects listed in the data model:
//! `state.json`, `heartbeat.json`, `.reconciler_stale_seen`,
//! `restart_config.json`, `restart.lock`, `.owner.lock`.
//!
//! Every record that is read-modify-written by this reconciler carries an
//! `extra` bag of unrecognized fields so a newer worker or operator CLI
//! writing fields this binary does not know about survives a round trip.

use crate::transitions::{ActorClass, RunState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry in `state.json.history`, bounded to the last 20.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub from: Option<String>,
    pub to: String,
    pub at: DateTime<Utc>,
    pub by: String,
    pub reason: String,
}

/// The canonical `state.json` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: Option<RunState>,
    pub prev_state: Option<RunState>,
    pub state_version: u64,
    pub owner_id: Option<String>,
    pub instance_name: Option<String>,
    pub zone: Option<String>,
    pub attempt: u32,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub reason: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Fields neither this struct nor any version of it has ever named.
    /// Preserved verbatim across read-modify-write.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StateRecord {
    /// The record implied by a missing `state.json`: no state yet,
    /// generation 0, empty history.
    pub fn absent() -> Self {
        Self {
            state: None,
            prev_state: None,
            state_version: 0,
            owner_id: None,
            instance_name: None,
            zone: None,
            attempt: 0,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_by: String::new(),
            reason: String::new(),
            history: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        crate::transitions::is_terminal(self.state)
    }

    /// Builds the next record for an accepted transition: bumps
    /// `state_version`, carries `owner_id`/`instance_name`/`zone`/`attempt`
    /// forward, appends and trims `history`.
    pub fn advance(&self, to: RunState, actor: ActorClass, reason: &str, now: DateTime<Utc>) -> Self {
        let mut history = self.history.clone();
        history.push(HistoryEntry {
            from: self.state.map(|s| s.as_str().to_string()),
            to: to.as_str().to_string(),
            at: now,
            by: actor.as_str().to_string(),
            reason: reason.to_string(),
        });
        if history.len() > 20 {
            let drop = history.len() - 20;
            history.drain(0..drop);
        }

        Self {
            state: Some(to),
            prev_state: self.state,
            state_version: self.state_version + 1,
            owner_id: self.owner_id.clone(),
            instance_name: self.instance_name.clone(),
            zone: self.zone.clone(),
            attempt: self.attempt,
            updated_at: now,
            updated_by: actor.as_str().to_string(),
            reason: reason.to_string(),
            history,
            extra: self.extra.clone(),
        }
    }
}

/// `heartbeat.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub uptime_sec: Option<u64>,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

/// `.reconciler_stale_seen`, the two-stage detection cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleMarker {
    pub timestamp: DateTime<Utc>,
    pub heartbeat_epoch_at_observation: DateTime<Utc>,
}

/// `restart_config.json`, read-only to the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartConfig {
    pub image: String,
    pub machine_type: String,
    /// Ordered fallback zone list, tried in order by the restart executor.
    pub fallback_zones: Vec<String>,
    pub service_account: String,
    pub container_name: String,
    pub job_command: String,
    #[serde(default)]
    pub conda_env: Option<String>,
    #[serde(default)]
    pub notify_secret: Option<String>,
    #[serde(default)]
    pub startup_script: Option<String>,
    #[serde(default)]
    pub metadata_prefix: Option<String>,
    #[serde(default)]
    pub gpu_enabled: bool,
    #[serde(default)]
    pub gpu_type: Option<String>,
    #[serde(default)]
    pub gpu_count: Option<u32>,
    #[serde(default)]
    pub install_nvidia_driver: bool,
    #[serde(default = "default_auto_restart_max")]
    pub auto_restart_max: u32,
}

fn default_auto_restart_max() -> u32 {
    3
}

/// `restart.lock`, the mutual-exclusion cookie for the restart protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartLock {
    pub actor: String,
    pub hostname: String,
    pub acquired_at: DateTime<Utc>,
    pub attempt: u32,
    pub ttl_sec: u64,
}

/// `.owner.lock`, the worker's claim on a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerLock {
    pub instance: String,
    pub zone: String,
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
