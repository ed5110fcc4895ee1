// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from compute-instance operations.
///
/// There is deliberately no "ambiguous" variant: `vm_exists` never returns
/// one of these for anything but an explicit not-found — every other
/// failure is swallowed fail-safe into `Ok(true)` at the call site,
/// because the reconciler must never declare a run orphaned on the
/// strength of a transient compute-API error.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("compute request failed: {0}")]
    Transient(String),

    #[error("instance create failed in zone {zone}: {reason}")]
    CreateFailed { zone: String, reason: String },

    #[error("compute error: {0}")]
    Other(String),
}
