// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance spec construction: VM naming, SPOT provisioning model,
//! and metadata layout. The reconciler never generates the startup script;
//! it forwards whatever `restart_config` supplies verbatim.

use base64::Engine as _;
use reconciler_core::{RestartConfig, RunId};
use std::collections::BTreeMap;

const DEFAULT_METADATA_PREFIX: &str = "reconciler";

/// A single accelerator attachment (GPU).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accelerator {
    pub accelerator_type: String,
    pub count: u32,
}

/// Everything `create_instance` needs to declare a replacement instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSpec {
    pub name: String,
    pub image: String,
    pub machine_type: String,
    pub service_account: String,
    /// SPOT provisioning model is always set; these are not
    /// configurable per-run because the reconciler exists specifically to
    /// handle preemption.
    pub instance_termination_action: &'static str,
    pub on_host_maintenance: &'static str,
    pub startup_script: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub accelerator: Option<Accelerator>,
}

/// Derives the replacement instance's name: lowercase
/// `<container_name>-<sanitized_run_id>-<attempt>`, truncated to 63
/// characters, first character forced alphabetic.
pub fn build_instance_name(container_name: &str, run_id: &RunId, attempt: u32) -> String {
    let raw = format!(
        "{}-{}-{}",
        container_name.to_lowercase(),
        run_id.sanitized(),
        attempt
    )
    .to_lowercase();

    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();

    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        name = format!("vm-{name}");
    }

    name.truncate(63);
    // Truncation may leave a trailing '-', which most compute APIs reject;
    // trim it back to an alphanumeric boundary.
    while name.ends_with('-') {
        name.pop();
    }
    name
}

/// Builds the full instance spec from `restart_config`.
pub fn build_instance_spec(
    restart_config: &RestartConfig,
    run_id: &RunId,
    bucket: &str,
    attempt: u32,
) -> InstanceSpec {
    let name = build_instance_name(&restart_config.container_name, run_id, attempt);
    let prefix = restart_config
        .metadata_prefix
        .clone()
        .unwrap_or_else(|| DEFAULT_METADATA_PREFIX.to_string());

    let encoded_job_command = base64::engine::general_purpose::STANDARD.encode(&restart_config.job_command);

    let mut metadata = BTreeMap::new();
    metadata.insert("spot-metadata-prefix".to_string(), prefix.clone());
    metadata.insert(format!("{prefix}-image-ref"), restart_config.image.clone());
    metadata.insert(format!("{prefix}-run-id"), run_id.as_str().to_string());
    metadata.insert(format!("{prefix}-bucket"), bucket.to_string());
    metadata.insert(format!("{prefix}-job-command"), encoded_job_command);
    if let Some(conda_env) = &restart_config.conda_env {
        metadata.insert(format!("{prefix}-conda-env"), conda_env.clone());
    }
    if let Some(notify_secret) = &restart_config.notify_secret {
        metadata.insert(format!("{prefix}-notify-secret"), notify_secret.clone());
    }
    if restart_config.install_nvidia_driver {
        metadata.insert("install-nvidia-driver".to_string(), "true".to_string());
    }

    let accelerator = restart_config.gpu_enabled.then(|| Accelerator {
        accelerator_type: restart_config.gpu_type.clone().unwrap_or_default(),
        count: restart_config.gpu_count.unwrap_or(1),
    });

    InstanceSpec {
        name,
        image: restart_config.image.clone(),
        machine_type: restart_config.machine_type.clone(),
        service_account: restart_config.service_account.clone(),
        instance_termination_action: "DELETE",
        on_host_maintenance: "TERMINATE",
        startup_script: restart_config.startup_script.clone(),
        metadata,
        accelerator,
    }
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
