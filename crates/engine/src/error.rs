// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for the reconciliation engine.

use reconciler_compute::ComputeError;
use reconciler_core::TransitionError;
use reconciler_notify::NotifyError;
use reconciler_store::StoreError;
use thiserror::Error;

/// Errors surfaced while reconciling a single run.
///
/// Nothing escapes `reconcile_run`: [`crate::ReconcileEngine::reconcile_all`]
/// catches every variant, logs it with the run id, and continues to the
/// next run rather than aborting the whole sweep.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("transition rejected: {0}")]
    TransitionRejected(#[from] TransitionError),

    #[error("CAS retries exhausted writing state.json for this run")]
    CasRetriesExhausted,

    #[error("restart aborted: {0}")]
    RestartAborted(String),
}
