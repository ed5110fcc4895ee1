// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

const VARS: &[&str] = &[
    "BUCKET",
    "PROJECT",
    "DRY_RUN",
    "HEARTBEAT_STALE_SEC",
    "RESTARTING_STUCK_SEC",
    "STALE_MARKER_MIN_AGE_SEC",
    "DISCORD_WEBHOOK_URL",
    "PORT",
    "HOSTNAME",
];

fn clear_env() {
    for v in VARS {
        std::env::remove_var(v);
    }
}

#[test]
#[serial]
fn missing_bucket_is_a_fatal_error() {
    clear_env();
    std::env::set_var("PROJECT", "my-project");

    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::Missing("BUCKET")));
    clear_env();
}

#[test]
#[serial]
fn missing_project_is_a_fatal_error() {
    clear_env();
    std::env::set_var("BUCKET", "my-bucket");

    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::Missing("PROJECT")));
    clear_env();
}

#[test]
#[serial]
fn required_vars_alone_produce_documented_defaults() {
    clear_env();
    std::env::set_var("BUCKET", "my-bucket");
    std::env::set_var("PROJECT", "my-project");

    let config = Config::from_env().unwrap();
    assert_eq!(config.engine.bucket, "my-bucket");
    assert_eq!(config.engine.project, "my-project");
    assert!(!config.engine.dry_run);
    assert_eq!(config.engine.heartbeat_stale_sec, 600);
    assert_eq!(config.engine.restarting_stuck_sec, 600);
    assert_eq!(config.engine.stale_marker_min_age_sec, 120);
    assert_eq!(config.port, 8080);
    assert_eq!(config.discord_webhook_url, None);
    clear_env();
}

#[test]
#[serial]
fn overrides_are_honored() {
    clear_env();
    std::env::set_var("BUCKET", "my-bucket");
    std::env::set_var("PROJECT", "my-project");
    std::env::set_var("DRY_RUN", "true");
    std::env::set_var("HEARTBEAT_STALE_SEC", "30");
    std::env::set_var("PORT", "9090");
    std::env::set_var("DISCORD_WEBHOOK_URL", "https://discord.example/hook");

    let config = Config::from_env().unwrap();
    assert!(config.engine.dry_run);
    assert_eq!(config.engine.heartbeat_stale_sec, 30);
    assert_eq!(config.port, 9090);
    assert_eq!(config.discord_webhook_url.as_deref(), Some("https://discord.example/hook"));
    clear_env();
}

#[test]
#[serial]
fn malformed_numeric_override_is_a_fatal_error() {
    clear_env();
    std::env::set_var("BUCKET", "my-bucket");
    std::env::set_var("PROJECT", "my-project");
    std::env::set_var("PORT", "not-a-port");

    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid("PORT", ..)));
    clear_env();
}

#[test]
#[serial]
fn malformed_boolean_override_is_a_fatal_error() {
    clear_env();
    std::env::set_var("BUCKET", "my-bucket");
    std::env::set_var("PROJECT", "my-project");
    std::env::set_var("DRY_RUN", "maybe");

    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid("DRY_RUN", ..)));
    clear_env();
}
