//! End-to-end scenarios for the cloud reconciler.
//!
//! Each scenario wires a real `ReconcileEngine` to the in-memory fakes and
//! asserts both the returned action string and the resulting store state.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/terminal.rs"]
mod terminal;
#[path = "specs/stale_detection.rs"]
mod stale_detection;
#[path = "specs/orphan.rs"]
mod orphan;
#[path = "specs/drift.rs"]
mod drift;
#[path = "specs/restart.rs"]
mod restart;
