// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `ComputeAdapter` for tests, following the same `Arc<Mutex<..>>`
//! plus call-log pattern as `reconciler_store::FakeStoreAdapter`.
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::{ComputeAdapter, ComputeError, InstanceSpec, VmRef};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded compute call, for test assertions on call order/count.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputeCall {
    VmExists { project: String, zone: String, name: String },
    VmSearchByPattern { project: String, name_pattern: String },
    CreateInstance { project: String, zone: String, name: String },
}

#[derive(Default)]
struct FakeComputeState {
    // (project, zone, name) -> alive
    instances: HashMap<(String, String, String), bool>,
    create_failures: HashMap<String, String>,
    calls: Vec<ComputeCall>,
}

/// In-memory `ComputeAdapter` tracking a small instance registry keyed by
/// `(project, zone, name)`.
#[derive(Clone, Default)]
pub struct FakeComputeAdapter {
    inner: Arc<Mutex<FakeComputeState>>,
}

impl FakeComputeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ComputeCall> {
        self.inner.lock().calls.clone()
    }

    /// Seeds an existing instance, alive or not.
    pub fn add_vm(&self, project: &str, zone: &str, name: &str, alive: bool) {
        self.inner.lock().instances.insert(
            (project.to_string(), zone.to_string(), name.to_string()),
            alive,
        );
    }

    /// Flips a previously-seeded instance's liveness (e.g. to simulate
    /// preemption mid-test).
    pub fn set_alive(&self, project: &str, zone: &str, name: &str, alive: bool) {
        self.inner
            .lock()
            .instances
            .insert((project.to_string(), zone.to_string(), name.to_string()), alive);
    }

    /// Makes `create_instance` fail in `zone` with `reason` until cleared.
    pub fn fail_create_in_zone(&self, zone: &str, reason: &str) {
        self.inner
            .lock()
            .create_failures
            .insert(zone.to_string(), reason.to_string());
    }

    pub fn instance_count(&self) -> usize {
        self.inner.lock().instances.len()
    }
}

#[async_trait]
impl ComputeAdapter for FakeComputeAdapter {
    async fn vm_exists(&self, project: &str, zone: &str, name: &str) -> bool {
        let mut inner = self.inner.lock();
        inner.calls.push(ComputeCall::VmExists {
            project: project.to_string(),
            zone: zone.to_string(),
            name: name.to_string(),
        });
        inner
            .instances
            .get(&(project.to_string(), zone.to_string(), name.to_string()))
            .copied()
            .unwrap_or(false)
    }

    async fn vm_search_by_pattern(
        &self,
        project: &str,
        name_pattern: &str,
    ) -> Result<Option<VmRef>, ComputeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ComputeCall::VmSearchByPattern {
            project: project.to_string(),
            name_pattern: name_pattern.to_string(),
        });
        let found = inner
            .instances
            .iter()
            .find(|((p, _, name), alive)| p == project && name.contains(name_pattern) && **alive)
            .map(|((_, zone, name), _)| VmRef {
                name: name.clone(),
                zone: zone.clone(),
            });
        Ok(found)
    }

    async fn create_instance(
        &self,
        project: &str,
        zone: &str,
        spec: &InstanceSpec,
    ) -> Result<String, ComputeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ComputeCall::CreateInstance {
            project: project.to_string(),
            zone: zone.to_string(),
            name: spec.name.clone(),
        });

        if let Some(reason) = inner.create_failures.get(zone).cloned() {
            return Err(ComputeError::CreateFailed {
                zone: zone.to_string(),
                reason,
            });
        }

        inner
            .instances
            .insert((project.to_string(), zone.to_string(), spec.name.clone()), true);
        Ok(spec.name.clone())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
