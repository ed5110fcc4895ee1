// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed set of outcomes a single `reconcile_run` invocation can
//! produce. Expressing this as a
//! tagged-variant enum rather than an ad-hoc string lets tests match
//! exhaustively and lets `reconcile_all` build its `{run_id: action}` map
//! without re-deriving the wire string in two places.

use std::fmt;

/// Outcome of reconciling one run. `Display` produces the exact action
/// string the HTTP handler's `actions` map and the logs use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// First stale heartbeat observation recorded; two-stage protocol armed.
    StaleFirstObservation,
    /// Heartbeat stale but the named instance is still alive; logged only.
    StaleVmAlive,
    /// Heartbeat stale, no instance metadata, but pattern search found a live VM.
    StaleVmFoundByPattern,
    /// Run was already `PREEMPTED`; reconciler confirms but does not mutate state.
    PreemptedConfirmed,
    /// Run transitioned to `ORPHANED` and the restart executor did not act
    /// (disabled, exhausted, `.stop` present, or no lease available).
    Orphaned,
    /// A `RESTARTING` run was stuck past the threshold and recovered to `ORPHANED`.
    RestartingStuckRecovered,
    /// The restart executor completed the full protocol successfully.
    Restarted,
    /// The restart executor aborted after acquiring the lease and rolled state back.
    RestartFailed,
    /// Dry-run only: restart preconditions passed but no side effects were performed.
    WouldRestart,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::StaleFirstObservation => "stale_first_observation",
            Action::StaleVmAlive => "stale_vm_alive",
            Action::StaleVmFoundByPattern => "stale_vm_found_by_pattern",
            Action::PreemptedConfirmed => "preempted_confirmed",
            Action::Orphaned => "orphaned",
            Action::RestartingStuckRecovered => "restarting_stuck_recovered",
            Action::Restarted => "restarted",
            Action::RestartFailed => "restart_failed",
            Action::WouldRestart => "would_restart",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
