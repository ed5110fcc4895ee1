// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ComputeAdapter` backed by the Google Compute Engine REST API.

use crate::{ComputeAdapter, ComputeError, InstanceSpec, VmRef};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v2/instance/service-accounts/default/token";
const COMPUTE_API_ROOT: &str = "https://compute.googleapis.com/compute/v1";

#[derive(Debug, serde::Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Production `ComputeAdapter` over GCE.
#[derive(Clone)]
pub struct GceComputeAdapter {
    client: Client,
}

impl Default for GceComputeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl GceComputeAdapter {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("reqwest client construction cannot fail with these settings");
        Self { client }
    }

    async fn bearer_token(&self) -> Result<String, ComputeError> {
        let resp = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| ComputeError::Transient(e.to_string()))?;
        let token: MetadataToken = resp
            .json()
            .await
            .map_err(|e| ComputeError::Transient(format!("metadata token response: {e}")))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl ComputeAdapter for GceComputeAdapter {
    async fn vm_exists(&self, project: &str, zone: &str, name: &str) -> bool {
        let token = match self.bearer_token().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "vm_exists: fail-safe true (token fetch failed)");
                return true;
            }
        };
        let url = format!("{COMPUTE_API_ROOT}/projects/{project}/zones/{zone}/instances/{name}");
        match self.client.get(url).bearer_auth(token).send().await {
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => false,
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "vm_exists: fail-safe true (non-2xx, non-404)");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "vm_exists: fail-safe true (request error)");
                true
            }
        }
    }

    async fn vm_search_by_pattern(
        &self,
        project: &str,
        name_pattern: &str,
    ) -> Result<Option<VmRef>, ComputeError> {
        let token = self.bearer_token().await?;
        let url = format!("{COMPUTE_API_ROOT}/projects/{project}/aggregated/instances");
        let resp = self
            .client
            .get(url)
            .query(&[("filter", format!("name eq \"{name_pattern}\""))])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ComputeError::Transient(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ComputeError::Other(format!(
                "aggregated list returned {}",
                resp.status()
            )));
        }

        #[derive(serde::Deserialize)]
        struct Instance {
            name: String,
            zone: String,
        }
        #[derive(serde::Deserialize)]
        struct ScopedList {
            #[serde(default)]
            instances: Vec<Instance>,
        }
        #[derive(serde::Deserialize)]
        struct AggregatedResponse {
            #[serde(default)]
            items: std::collections::BTreeMap<String, ScopedList>,
        }

        let body: AggregatedResponse = resp
            .json()
            .await
            .map_err(|e| ComputeError::Transient(e.to_string()))?;

        for scoped in body.items.into_values() {
            if let Some(instance) = scoped.instances.into_iter().next() {
                // The zone URL's last path segment is the zone name.
                let zone = instance
                    .zone
                    .rsplit('/')
                    .next()
                    .unwrap_or(&instance.zone)
                    .to_string();
                return Ok(Some(VmRef {
                    name: instance.name,
                    zone,
                }));
            }
        }
        Ok(None)
    }

    async fn create_instance(
        &self,
        project: &str,
        zone: &str,
        spec: &InstanceSpec,
    ) -> Result<String, ComputeError> {
        let token = self.bearer_token().await?;
        let url = format!("{COMPUTE_API_ROOT}/projects/{project}/zones/{zone}/instances");

        let mut metadata_items: Vec<serde_json::Value> = spec
            .metadata
            .iter()
            .map(|(k, v)| serde_json::json!({"key": k, "value": v}))
            .collect();
        if let Some(script) = &spec.startup_script {
            metadata_items.push(serde_json::json!({"key": "startup-script", "value": script}));
        }

        let mut body = serde_json::json!({
            "name": spec.name,
            "machineType": format!("zones/{zone}/machineTypes/{}", spec.machine_type),
            "scheduling": {
                "provisioningModel": "SPOT",
                "instanceTerminationAction": spec.instance_termination_action,
                "onHostMaintenance": spec.on_host_maintenance,
                "automaticRestart": false,
            },
            "serviceAccounts": [{
                "email": spec.service_account,
                "scopes": ["https://www.googleapis.com/auth/cloud-platform"],
            }],
            "disks": [{
                "boot": true,
                "initializeParams": { "sourceImage": spec.image },
            }],
            "metadata": { "items": metadata_items },
        });

        if let Some(accel) = &spec.accelerator {
            body["guestAccelerators"] = serde_json::json!([{
                "acceleratorType": format!("zones/{zone}/acceleratorTypes/{}", accel.accelerator_type),
                "acceleratorCount": accel.count,
            }]);
        }

        let resp = self
            .client
            .post(url)
            .bearer_auth(token.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ComputeError::CreateFailed {
                zone: zone.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ComputeError::CreateFailed {
                zone: zone.to_string(),
                reason: format!("insert returned {status}: {text}"),
            });
        }

        // Production callers poll the returned operation until DONE; here we
        // verify the instance is retrievable by name, matching the "blocking
        // until the create operation is done and the instance is retrievable
        // by name" contract.
        let get_url =
            format!("{COMPUTE_API_ROOT}/projects/{project}/zones/{zone}/instances/{}", spec.name);
        let verify = self
            .client
            .get(get_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ComputeError::CreateFailed {
                zone: zone.to_string(),
                reason: format!("post-create verification failed: {e}"),
            })?;
        if !verify.status().is_success() {
            return Err(ComputeError::CreateFailed {
                zone: zone.to_string(),
                reason: format!("instance not retrievable after create: {}", verify.status()),
            });
        }

        Ok(spec.name.clone())
    }
}
