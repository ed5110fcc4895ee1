// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `StoreAdapter` for tests, following the same `Arc<Mutex<..>>`
//! plus call-log pattern as the rest of the workspace's fakes.
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::{Generation, StoreAdapter, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use reconciler_core::RunId;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded store call, for test assertions on call order/count.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    ReadText { key: String },
    Write { key: String, if_generation_match: Generation },
    Delete { key: String, if_generation_match: Generation },
    Exists { key: String },
    ListRunIds { prefix: String },
}

#[derive(Default)]
struct FakeStoreState {
    // key -> (bytes, generation)
    objects: HashMap<String, (Vec<u8>, Generation)>,
    next_generation: Generation,
    calls: Vec<StoreCall>,
}

/// In-memory `StoreAdapter` modeling generations, CAS preconditions and
/// prefix listing with plain data structures.
#[derive(Clone, Default)]
pub struct FakeStoreAdapter {
    inner: Arc<Mutex<FakeStoreState>>,
}

impl FakeStoreAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().calls.clone()
    }

    /// Seeds `key` with `bytes`, assigning it a fresh generation, and
    /// returns that generation.
    pub fn seed(&self, key: &str, bytes: impl Into<Vec<u8>>) -> Generation {
        let mut inner = self.inner.lock();
        inner.next_generation += 1;
        let generation = inner.next_generation;
        inner.objects.insert(key.to_string(), (bytes.into(), generation));
        generation
    }

    pub fn seed_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Generation {
        let bytes = serde_json::to_vec(value).expect("fake seed value must serialize");
        self.seed(key, bytes)
    }

    pub fn get(&self, key: &str) -> Option<(Vec<u8>, Generation)> {
        self.inner.lock().objects.get(key).cloned()
    }

    pub fn get_text(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|(bytes, _)| String::from_utf8(bytes).expect("fake object is valid utf8"))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().objects.contains_key(key)
    }
}

#[async_trait]
impl StoreAdapter for FakeStoreAdapter {
    async fn read_text(&self, key: &str) -> Result<Option<(String, Generation)>, StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::ReadText { key: key.to_string() });
        Ok(inner.objects.get(key).map(|(bytes, generation)| {
            (
                String::from_utf8(bytes.clone()).expect("fake object is valid utf8"),
                *generation,
            )
        }))
    }

    async fn write(
        &self,
        key: &str,
        bytes: Vec<u8>,
        if_generation_match: Generation,
    ) -> Result<Generation, StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::Write {
            key: key.to_string(),
            if_generation_match,
        });

        let current_generation = inner.objects.get(key).map(|(_, g)| *g).unwrap_or(0);
        if current_generation != if_generation_match {
            return Err(StoreError::PreconditionFailed {
                key: key.to_string(),
            });
        }

        inner.next_generation += 1;
        let new_generation = inner.next_generation;
        inner.objects.insert(key.to_string(), (bytes, new_generation));
        Ok(new_generation)
    }

    async fn delete(&self, key: &str, if_generation_match: Generation) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::Delete {
            key: key.to_string(),
            if_generation_match,
        });

        let current_generation = inner.objects.get(key).map(|(_, g)| *g).unwrap_or(0);
        if current_generation != if_generation_match {
            return Err(StoreError::PreconditionFailed {
                key: key.to_string(),
            });
        }
        inner.objects.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::Exists { key: key.to_string() });
        Ok(inner.objects.contains_key(key))
    }

    async fn list_run_ids(&self, prefix: &str) -> Result<Vec<RunId>, StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::ListRunIds {
            prefix: prefix.to_string(),
        });

        let mut ids: Vec<RunId> = inner
            .objects
            .keys()
            .filter_map(|key| key.strip_prefix(prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter(|segment| !segment.is_empty())
            .map(RunId::new)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
