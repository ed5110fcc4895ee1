// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from blob-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transient network/throttling error; the caller should abandon the
    /// current action and let the next reconcile invocation retry.
    #[error("store request failed: {0}")]
    Transient(String),

    /// `if_generation_match` was not satisfied: either the object already
    /// existed when `g=0` was demanded, or its generation had moved past `g`.
    #[error("precondition failed for key {key}")]
    PreconditionFailed { key: String },

    /// Any other non-transient failure the adapter cannot classify further.
    #[error("store error: {0}")]
    Other(String),
}
