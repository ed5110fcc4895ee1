// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Blob-store adapter: read/write access to per-run objects with
//! compare-and-swap via object generation numbers.
//!
//! One production implementation (`GcsStoreAdapter`, a thin REST client)
//! and one in-memory test double (`FakeStoreAdapter`), following the same
//! adapter/fake split used throughout this workspace.

mod adapter;
mod error;
mod gcs;

pub use adapter::{Generation, StoreAdapter};
pub use error::StoreError;
pub use gcs::GcsStoreAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStoreAdapter, StoreCall};
