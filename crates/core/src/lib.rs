// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! reconciler-core: shared domain types for the cloud reconciler
//!
//! Defines the run lifecycle state machine (states, actor classes, the
//! transition table and its guards), the wire-contract record types stored
//! under `runs/<run_id>/`, and a `Clock` abstraction the rest of the
//! workspace uses instead of calling `chrono::Utc::now()` directly.

pub mod clock;
pub mod id;
pub mod state;
pub mod transitions;

pub use clock::{Clock, SystemClock};
pub use id::RunId;
pub use state::{HistoryEntry, Heartbeat, OwnerLock, RestartConfig, RestartLock, StaleMarker, StateRecord};
pub use transitions::{
    is_terminal, status_compat, ActorClass, RunState, TransitionError, TransitionTable,
};

#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
