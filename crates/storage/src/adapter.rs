// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::StoreError;
use async_trait::async_trait;
use reconciler_core::RunId;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A blob-store object generation number. `0` is reserved by `write` to mean
/// "the object must not already exist."
pub type Generation = u64;

/// Uniform access to per-run objects in a blob store, with compare-and-swap
/// via object generation numbers. All CAS logic in the reconciler
/// goes through this trait; unconditional writes are forbidden for
/// `state.json`, `restart.lock` and `.owner.lock` by convention at the call
/// sites in `reconciler-engine`, not by anything this trait itself enforces.
#[async_trait]
pub trait StoreAdapter: Clone + Send + Sync + 'static {
    /// Reads raw text and its generation. `Ok(None)` means not found.
    async fn read_text(&self, key: &str) -> Result<Option<(String, Generation)>, StoreError>;

    /// Reads and parses JSON. A parse failure is treated as not-found,
    /// since callers cannot otherwise distinguish "never written" from
    /// "written by a future incompatible schema."
    async fn read_json<T>(&self, key: &str) -> Result<Option<(T, Generation)>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        match self.read_text(key).await? {
            None => Ok(None),
            Some((text, generation)) => match serde_json::from_str::<T>(&text) {
                Ok(value) => Ok(Some((value, generation))),
                Err(e) => {
                    tracing::warn!(key, error = %e, "treating unparseable JSON object as not found");
                    Ok(None)
                }
            },
        }
    }

    /// Writes `bytes` iff the current generation equals `if_generation_match`
    /// (`0` demands the object not exist). Returns the new generation on
    /// success, or `StoreError::PreconditionFailed` on CAS loss.
    async fn write(
        &self,
        key: &str,
        bytes: Vec<u8>,
        if_generation_match: Generation,
    ) -> Result<Generation, StoreError>;

    /// Serializes `value` as JSON and writes it with the same CAS semantics
    /// as [`StoreAdapter::write`].
    async fn write_json<T>(
        &self,
        key: &str,
        value: &T,
        if_generation_match: Generation,
    ) -> Result<Generation, StoreError>
    where
        T: Serialize + Sync,
    {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| StoreError::Other(format!("failed to serialize {key}: {e}")))?;
        self.write(key, bytes, if_generation_match).await
    }

    /// Deletes `key` iff its current generation equals `if_generation_match`.
    async fn delete(&self, key: &str, if_generation_match: Generation) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Enumerates the immediate children of `prefix` (default `runs/`) as
    /// run ids.
    async fn list_run_ids(&self, prefix: &str) -> Result<Vec<RunId>, StoreError>;
}
