// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{ComputeError, InstanceSpec};
use async_trait::async_trait;

/// A located instance: its name and the zone it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRef {
    pub name: String,
    pub zone: String,
}

/// Existence checks and creation operations against a cloud compute API.
#[async_trait]
pub trait ComputeAdapter: Clone + Send + Sync + 'static {
    /// Fail-safe existence check: any error other than an explicit
    /// not-found must be treated as `true` by the implementation so the
    /// reconciler never declares a run orphaned on ambiguous input.
    /// Because of this the method itself never returns `Err`.
    async fn vm_exists(&self, project: &str, zone: &str, name: &str) -> bool;

    /// Aggregated cross-zone lookup by name pattern, used when `state.json`
    /// lacks instance metadata.
    async fn vm_search_by_pattern(
        &self,
        project: &str,
        name_pattern: &str,
    ) -> Result<Option<VmRef>, ComputeError>;

    /// Creates `spec` in `zone`, blocking until the create operation is
    /// done and the instance is retrievable by name. Returns the created
    /// instance's name.
    async fn create_instance(
        &self,
        project: &str,
        zone: &str,
        spec: &InstanceSpec,
    ) -> Result<String, ComputeError>;
}
