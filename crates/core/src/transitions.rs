// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run lifecycle state machine: states, actor classes, and the
//! canonical transition table loaded from `state_transitions.json`.
//!
//! The table is shipped as a single data file at the workspace root so a
//! collaborating operator CLI can load the identical bytes; `transitions_hash`
//! lets both sides log a SHA-256 at startup and catch drift between them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// The canonical JSON document, embedded at compile time.
const TRANSITIONS_JSON: &str = include_str!("../../../state_transitions.json");

/// A run lifecycle state. `RunState` intentionally has no `Default`: the
/// sentinel "no state yet" case is represented by `Option<RunState>` /
/// the string `"null"` in the transition table, never by a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    Running,
    Complete,
    Failed,
    Partial,
    Preempted,
    Orphaned,
    Restarting,
    Stopped,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Running => "RUNNING",
            RunState::Complete => "COMPLETE",
            RunState::Failed => "FAILED",
            RunState::Partial => "PARTIAL",
            RunState::Preempted => "PREEMPTED",
            RunState::Orphaned => "ORPHANED",
            RunState::Restarting => "RESTARTING",
            RunState::Stopped => "STOPPED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "RUNNING" => RunState::Running,
            "COMPLETE" => RunState::Complete,
            "FAILED" => RunState::Failed,
            "PARTIAL" => RunState::Partial,
            "PREEMPTED" => RunState::Preempted,
            "ORPHANED" => RunState::Orphaned,
            "RESTARTING" => RunState::Restarting,
            "STOPPED" => RunState::Stopped,
            _ => return None,
        })
    }

    /// The terminal set: `{COMPLETE, FAILED, PARTIAL, STOPPED}`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Complete | RunState::Failed | RunState::Partial | RunState::Stopped
        )
    }

    /// Legacy-poller projection (`status.txt` content), per the table in
    /// `ORPHANED` and `RESTARTING` collapse onto their legacy
    /// equivalents so old pollers only ever see the smaller vocabulary
    /// they were built against.
    pub fn status_compat(&self) -> &'static str {
        match self {
            RunState::Running => "RUNNING",
            RunState::Complete => "COMPLETE",
            RunState::Failed => "FAILED",
            RunState::Partial => "PARTIAL",
            RunState::Preempted => "PREEMPTED",
            RunState::Orphaned => "PREEMPTED",
            RunState::Restarting => "RUNNING",
            RunState::Stopped => "STOPPED",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Is `state` (the `"null"` sentinel counts as "no state yet") terminal?
/// Exposed standalone because the engine frequently has `Option<RunState>`.
pub fn is_terminal(state: Option<RunState>) -> bool {
    state.is_some_and(|s| s.is_terminal())
}

/// Total projection function over `Option<RunState>`, matching `status_compat`
/// There is no sane projection of the `null` sentinel; callers only
/// ever call this once a record exists.
pub fn status_compat(state: RunState) -> &'static str {
    state.status_compat()
}

/// The four actor classes permitted to drive transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorClass {
    Vm,
    Reconciler,
    Local,
    Operator,
}

impl ActorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorClass::Vm => "vm",
            ActorClass::Reconciler => "reconciler",
            ActorClass::Local => "local",
            ActorClass::Operator => "operator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "vm" => ActorClass::Vm,
            "reconciler" => ActorClass::Reconciler,
            "local" => ActorClass::Local,
            "operator" => ActorClass::Operator,
            _ => return None,
        })
    }
}

impl std::fmt::Display for ActorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The two distinct ways `can_transition` can refuse an edge. Kept as
/// separate variants (rather than one string error) because the operator-CLI
/// parity tests assert on which rule fired, not just that it failed.
///
/// There is no `UnknownActor` variant here: `can_transition` takes a typed
/// `ActorClass`, so an unrecognized actor string is rejected earlier, at
/// `ActorClass::parse`, before it could ever reach this boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("transition {from} -> {to} is not allowed")]
    EdgeNotAllowed { from: String, to: String },
    #[error("transition {from} -> {to} is guarded; actor {actor} is not in the allowed list")]
    ActorNotPermitted {
        from: String,
        to: String,
        actor: String,
    },
}

/// On-disk shape of `state_transitions.json`.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct TransitionDocument {
    edges: HashMap<String, HashSet<String>>,
    actor_guards: HashMap<String, HashSet<String>>,
}

/// The loaded, queryable transition table.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    doc: TransitionDocument,
    raw: &'static str,
}

fn state_key(state: Option<RunState>) -> &'static str {
    match state {
        None => "null",
        Some(s) => s.as_str(),
    }
}

impl TransitionTable {
    /// Loads the canonical table embedded from the workspace-root
    /// `state_transitions.json`. This is the single source of truth; the
    /// operator CLI must load the identical file.
    pub fn load() -> Self {
        let doc: TransitionDocument =
            serde_json::from_str(TRANSITIONS_JSON).expect("state_transitions.json is valid JSON");
        Self {
            doc,
            raw: TRANSITIONS_JSON,
        }
    }

    /// SHA-256 of the canonical document's bytes, logged once at startup
    /// so drift between this binary and the operator CLI is visible.
    pub fn transitions_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.raw.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn is_terminal(&self, state: Option<RunState>) -> bool {
        is_terminal(state)
    }

    pub fn status_compat(&self, state: RunState) -> &'static str {
        status_compat(state)
    }

    /// Is `from -> to` permitted for `actor`? Distinguishes three failure
    /// modes so callers can log/test the exact reason.
    pub fn can_transition(
        &self,
        from: Option<RunState>,
        to: RunState,
        actor: ActorClass,
    ) -> Result<(), TransitionError> {
        let from_key = state_key(from);
        let to_key = to.as_str();

        let allowed_targets = self.doc.edges.get(from_key);
        let edge_allowed = allowed_targets.is_some_and(|targets| targets.contains(to_key));
        if !edge_allowed {
            return Err(TransitionError::EdgeNotAllowed {
                from: from_key.to_string(),
                to: to_key.to_string(),
            });
        }

        let guard_key = format!("{from_key}:{to_key}");
        if let Some(allowed_actors) = self.doc.actor_guards.get(&guard_key) {
            if !allowed_actors.contains(actor.as_str()) {
                return Err(TransitionError::ActorNotPermitted {
                    from: from_key.to_string(),
                    to: to_key.to_string(),
                    actor: actor.as_str().to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::load()
    }
}

#[cfg(test)]
#[path = "transitions_tests.rs"]
mod tests;
