// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration: the thresholds and process-wide flags the
//! decision tree and restart executor consult. Read once by the daemon
//! binary's `Config::from_env` and handed to the engine as plain data —
//! nothing in this crate re-reads the environment.

/// Tunables for the reconciliation engine, independent of which adapters
/// back it.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cloud compute project id, passed through to the compute adapter.
    pub project: String,
    /// Blob-store bucket name, embedded in replacement-instance metadata.
    pub bucket: String,
    /// Process-wide dry-run flag: every mutating operation
    /// becomes a logged no-op.
    pub dry_run: bool,
    /// `T_hb_stale` (default 600s): heartbeat age past which a run is
    /// considered stale.
    pub heartbeat_stale_sec: i64,
    /// `T_restart_stuck` (default 600s): age past which a `RESTARTING`
    /// run is checked for stuck recovery.
    pub restarting_stuck_sec: i64,
    /// `T_marker_min_age` (default 120s): minimum age of the stale marker
    /// before a second observation can confirm an orphan.
    pub stale_marker_min_age_sec: i64,
    /// Identifies this process in the `restart.lock` payload.
    pub hostname: String,
}

impl EngineConfig {
    pub fn heartbeat_stale(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.heartbeat_stale_sec)
    }

    pub fn restarting_stuck(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.restarting_stuck_sec)
    }

    pub fn stale_marker_min_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_marker_min_age_sec)
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            project: "test-project".to_string(),
            bucket: "test-bucket".to_string(),
            dry_run: false,
            heartbeat_stale_sec: 600,
            restarting_stuck_sec: 600,
            stale_marker_min_age_sec: 120,
            hostname: "test-host".to_string(),
        }
    }
}
