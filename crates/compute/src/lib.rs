// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Compute-instance adapter: existence checks, cross-zone name-pattern
//! search, and replacement-instance creation against a cloud compute API
//! plus the instance spec construction rules.

mod adapter;
mod error;
mod gce;
mod spec;

pub use adapter::{ComputeAdapter, VmRef};
pub use error::ComputeError;
pub use gce::GceComputeAdapter;
pub use spec::{build_instance_name, build_instance_spec, InstanceSpec};

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ComputeCall, FakeComputeAdapter};
