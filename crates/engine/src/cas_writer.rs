// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The CAS state writer: the only component permitted to mutate a
//! run's canonical `state.json`. Enforces terminal precedence and the
//! transition table, retries on CAS loss, and best-effort projects
//! `status.txt` and appends an event record on acceptance.

use crate::error::EngineError;
use chrono::Utc;
use rand::Rng;
use reconciler_core::{ActorClass, Clock, HistoryEntry, RunId, RunState, StateRecord, TransitionError, TransitionTable};
use reconciler_store::{StoreAdapter, StoreError};

/// Number of CAS attempts `write_state` makes before giving up.
const MAX_CAS_ATTEMPTS: u32 = 3;

/// Result of a `write_state` call. Only `Accepted` mutated `state.json`
/// (or would have, under dry-run); every other variant left it untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The transition was accepted; carries the record that was written
    /// (or, under dry-run, the record that *would* have been written).
    Accepted(StateRecord),
    /// `state.json` was already terminal; no write attempted.
    RejectedTerminal,
    /// The transition table refused the edge.
    RejectedTransition(TransitionError),
    /// Three consecutive CAS losses; another writer is winning the race.
    RejectedCasExhausted,
}

impl WriteOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, WriteOutcome::Accepted(_))
    }
}

/// Sole interface for mutating `state.json`.
pub struct CasWriter<S, CL> {
    store: S,
    transitions: TransitionTable,
    clock: CL,
    dry_run: bool,
}

impl<S, CL> CasWriter<S, CL>
where
    S: StoreAdapter,
    CL: Clock,
{
    pub fn new(store: S, transitions: TransitionTable, clock: CL, dry_run: bool) -> Self {
        Self {
            store,
            transitions,
            clock,
            dry_run,
        }
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Reads `state.json`, tolerating not-found as the "no state yet"
    /// sentinel at generation 0.
    async fn read_current(&self, run_id: &RunId) -> Result<(StateRecord, u64), EngineError> {
        let key = format!("{}state.json", run_id.key_prefix());
        match self.store.read_json::<StateRecord>(&key).await? {
            Some((record, generation)) => Ok((record, generation)),
            None => Ok((StateRecord::absent(), 0)),
        }
    }

    /// Writes the transition `current.state -> new_state` for `run_id`, if
    /// the transition table and terminal-precedence invariant allow it.
    pub async fn write_state(
        &self,
        run_id: &RunId,
        new_state: RunState,
        reason: &str,
        actor: ActorClass,
    ) -> Result<WriteOutcome, EngineError> {
        let (mut current, mut generation) = self.read_current(run_id).await?;

        if current.is_terminal() {
            tracing::info!(run_id = %run_id, state = ?current.state, "state already terminal, rejecting transition");
            return Ok(WriteOutcome::RejectedTerminal);
        }

        if let Err(e) = self.transitions.can_transition(current.state, new_state, actor) {
            tracing::info!(run_id = %run_id, from = ?current.state, to = %new_state, error = %e, "transition rejected");
            return Ok(WriteOutcome::RejectedTransition(e));
        }

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let now = self.clock.now();
            let next = current.advance(new_state, actor, reason, now);

            if self.dry_run {
                tracing::info!(run_id = %run_id, from = ?current.state, to = %new_state, "dry-run: would write state");
                return Ok(WriteOutcome::Accepted(next));
            }

            let state_key = format!("{}state.json", run_id.key_prefix());
            match self.store.write_json(&state_key, &next, generation).await {
                Ok(_) => {
                    tracing::info!(run_id = %run_id, from = ?current.state, to = %new_state, "state written");
                    self.project_status(run_id, new_state).await;
                    self.append_event(run_id, now, next.history.last()).await;
                    return Ok(WriteOutcome::Accepted(next));
                }
                Err(StoreError::PreconditionFailed { .. }) => {
                    tracing::info!(run_id = %run_id, attempt, "CAS conflict on state.json, retrying");
                    let (re_current, re_generation) = self.read_current(run_id).await?;
                    if re_current.is_terminal() {
                        return Ok(WriteOutcome::RejectedTerminal);
                    }
                    current = re_current;
                    generation = re_generation;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(run_id = %run_id, "CAS retries exhausted for state.json");
        Ok(WriteOutcome::RejectedCasExhausted)
    }

    /// Best-effort, unconditional overwrite of `status.txt` with the
    /// projection of `new_state`. Failures are logged, never
    /// propagated: events and status are advisory.
    async fn project_status(&self, run_id: &RunId, new_state: RunState) {
        let key = format!("{}status.txt", run_id.key_prefix());
        let generation = match self.store.read_text(&key).await {
            Ok(Some((_, g))) => g,
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "status.txt read failed before projection write");
                0
            }
        };
        let body = reconciler_core::status_compat(new_state).as_bytes().to_vec();
        if let Err(e) = self.store.write(&key, body, generation).await {
            tracing::warn!(run_id = %run_id, error = %e, "status.txt projection write failed");
        }
    }

    /// Best-effort append of an event object recording `entry`.
    async fn append_event(
        &self,
        run_id: &RunId,
        now: chrono::DateTime<Utc>,
        entry: Option<&HistoryEntry>,
    ) {
        let Some(entry) = entry else { return };
        let ts = now.format("%Y%m%dT%H%M%SZ");
        let nonce: u64 = rand::thread_rng().gen_range(0..0x1_0000_0000);
        let key = format!("{}events/{ts}_reconciler_{nonce:08x}.json", run_id.key_prefix());
        if let Err(e) = self.store.write_json(&key, entry, 0).await {
            tracing::warn!(run_id = %run_id, error = %e, "event log append failed");
        }
    }
}

#[cfg(test)]
#[path = "cas_writer_tests.rs"]
mod tests;
