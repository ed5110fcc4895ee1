// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide configuration, read once from `std::env` at startup.
//!
//! Explicit accessor functions rather than a derive-based config crate, so
//! each variable's parsing and defaulting rule is visible at its call site.

use std::env::VarError;

use reconciler_engine::EngineConfig;
use thiserror::Error;

/// Fatal startup configuration error. Missing or malformed required
/// variables abort the process before any adapter is constructed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {0} is not valid UTF-8")]
    NotUnicode(&'static str),

    #[error("environment variable {0}={1:?} could not be parsed: {2}")]
    Invalid(&'static str, String, String),
}

/// Top-level daemon configuration: everything the HTTP server, the engine
/// and the adapters need, assembled once at process startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    pub discord_webhook_url: Option<String>,
    pub port: u16,
}

impl Config {
    /// Parse configuration from the process environment. `BUCKET` and
    /// `PROJECT` are required; everything else has a documented default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bucket = require_str("BUCKET")?;
        let project = require_str("PROJECT")?;
        let dry_run = bool_var("DRY_RUN", false)?;
        let heartbeat_stale_sec = i64_var("HEARTBEAT_STALE_SEC", 600)?;
        let restarting_stuck_sec = i64_var("RESTARTING_STUCK_SEC", 600)?;
        let stale_marker_min_age_sec = i64_var("STALE_MARKER_MIN_AGE_SEC", 120)?;
        let port = u16_var("PORT", 8080)?;
        let discord_webhook_url = optional_str("DISCORD_WEBHOOK_URL");
        let hostname = optional_str("HOSTNAME").unwrap_or_else(|| "reconciler-daemon".to_string());

        Ok(Self {
            engine: EngineConfig {
                project,
                bucket,
                dry_run,
                heartbeat_stale_sec,
                restarting_stuck_sec,
                stale_marker_min_age_sec,
                hostname,
            },
            discord_webhook_url,
            port,
        })
    }
}

fn require_str(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) => Ok(v),
        Err(VarError::NotPresent) => Err(ConfigError::Missing(name)),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
    }
}

fn optional_str(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn bool_var(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(name, raw, "expected a boolean".to_string())),
        },
    }
}

fn i64_var(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
        Ok(raw) => raw.parse::<i64>().map_err(|e| ConfigError::Invalid(name, raw, e.to_string())),
    }
}

fn u16_var(name: &'static str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
        Ok(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid(name, raw, e.to_string())),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
