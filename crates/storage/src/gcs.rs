// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `StoreAdapter` backed by the Google Cloud Storage JSON API over `reqwest`.
//!
//! Authenticates via the GCE metadata server's instance service account,
//! the same mechanism used by `GceComputeAdapter`; there is exactly one
//! long-lived `reqwest::Client` per process, constructed once and injected
//! rather than built lazily on first use.

use crate::{Generation, StoreAdapter, StoreError};
use async_trait::async_trait;
use reconciler_core::RunId;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v2/instance/service-accounts/default/token";
const GCS_API_ROOT: &str = "https://storage.googleapis.com";

#[derive(Debug, serde::Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Production `StoreAdapter` over GCS.
#[derive(Clone)]
pub struct GcsStoreAdapter {
    client: Client,
    bucket: String,
}

impl GcsStoreAdapter {
    pub fn new(bucket: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client construction cannot fail with these settings");
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    async fn bearer_token(&self) -> Result<String, StoreError> {
        let resp = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        let token: MetadataToken = resp
            .json()
            .await
            .map_err(|e| StoreError::Transient(format!("metadata token response: {e}")))?;
        Ok(token.access_token)
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{GCS_API_ROOT}/storage/v1/b/{}/o/{}",
            self.bucket,
            urlencode(key)
        )
    }
}

fn urlencode(key: &str) -> String {
    // GCS object names allow most characters; the object path segment must
    // percent-encode '/' so nested keys (e.g. `runs/<id>/state.json`) survive
    // as a single path segment per the JSON API's object-name convention.
    key.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[async_trait]
impl StoreAdapter for GcsStoreAdapter {
    async fn read_text(&self, key: &str) -> Result<Option<(String, Generation)>, StoreError> {
        let token = self.bearer_token().await?;
        let resp = self
            .client
            .get(self.object_url(key))
            .query(&[("alt", "media")])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(StoreError::Other(format!(
                "GET {key} returned {}",
                resp.status()
            )));
        }
        let generation = resp
            .headers()
            .get("x-goog-generation")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let text = resp
            .text()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(Some((text, generation)))
    }

    async fn write(
        &self,
        key: &str,
        bytes: Vec<u8>,
        if_generation_match: Generation,
    ) -> Result<Generation, StoreError> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{GCS_API_ROOT}/upload/storage/v1/b/{}/o",
            self.bucket
        );
        let resp = self
            .client
            .post(url)
            .query(&[
                ("uploadType", "media"),
                ("name", key),
                ("ifGenerationMatch", &if_generation_match.to_string()),
            ])
            .bearer_auth(token)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;

        if resp.status() == StatusCode::PRECONDITION_FAILED {
            return Err(StoreError::PreconditionFailed {
                key: key.to_string(),
            });
        }
        if !resp.status().is_success() {
            return Err(StoreError::Other(format!(
                "PUT {key} returned {}",
                resp.status()
            )));
        }
        #[derive(serde::Deserialize)]
        struct ObjectMeta {
            generation: String,
        }
        let meta: ObjectMeta = resp
            .json()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        meta.generation
            .parse::<u64>()
            .map_err(|e| StoreError::Other(format!("unparseable generation: {e}")))
    }

    async fn delete(&self, key: &str, if_generation_match: Generation) -> Result<(), StoreError> {
        let token = self.bearer_token().await?;
        let resp = self
            .client
            .delete(self.object_url(key))
            .query(&[("ifGenerationMatch", if_generation_match.to_string())])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;

        if resp.status() == StatusCode::PRECONDITION_FAILED {
            return Err(StoreError::PreconditionFailed {
                key: key.to_string(),
            });
        }
        if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
            return Err(StoreError::Other(format!(
                "DELETE {key} returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.read_text(key).await?.is_some())
    }

    async fn list_run_ids(&self, prefix: &str) -> Result<Vec<RunId>, StoreError> {
        let token = self.bearer_token().await?;
        let url = format!("{GCS_API_ROOT}/storage/v1/b/{}/o", self.bucket);
        let resp = self
            .client
            .get(url)
            .query(&[("prefix", prefix), ("delimiter", "/")])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(StoreError::Other(format!(
                "LIST {prefix} returned {}",
                resp.status()
            )));
        }
        #[derive(serde::Deserialize)]
        struct ListResponse {
            #[serde(default)]
            prefixes: Vec<String>,
        }
        let body: ListResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;

        let run_ids = body
            .prefixes
            .into_iter()
            .filter_map(|p| {
                p.strip_prefix(prefix)
                    .and_then(|rest| rest.strip_suffix('/'))
                    .map(RunId::new)
            })
            .collect();
        Ok(run_ids)
    }
}
