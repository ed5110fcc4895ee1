// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! reconciler-daemon
//!
//! HTTP entry point for the cloud reconciler: wires a [`Config`] read from
//! the environment into the production adapters and the reconciliation
//! engine, then either serves `POST /reconcile` / `POST /` forever, or
//! (with `--once`) runs a single pass and exits for cron-style invocation.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use reconciler_daemon::{build_engine, build_router, reconcile_all_json, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut once = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("reconciler-daemon {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--once" => once = true,
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: reconciler-daemon [--once | --help | --version]");
                std::process::exit(1);
            }
        }
    }

    setup_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "fatal: invalid configuration");
            std::process::exit(1);
        }
    };

    info!(
        dry_run = config.engine.dry_run,
        project = %config.engine.project,
        bucket = %config.engine.bucket,
        "reconciler-daemon configured"
    );

    let engine = Arc::new(build_engine(&config));

    if once {
        let body = reconcile_all_json(&engine).await;
        println!("{body}");
        return Ok(());
    }

    let router = build_router(Arc::clone(&engine));
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "reconciler-daemon listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;
    info!("reconciler-daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}

fn print_help() {
    println!("reconciler-daemon {}", env!("CARGO_PKG_VERSION"));
    println!("Reconciles preempted and orphaned training runs against their cloud state.");
    println!();
    println!("USAGE:");
    println!("    reconciler-daemon [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --once           Run a single reconcile_all pass and exit (cron-style invocation)");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
    println!();
    println!("CONFIGURATION (environment variables):");
    println!("    BUCKET                     blob-store bucket name (required)");
    println!("    PROJECT                    compute project id (required)");
    println!("    DRY_RUN                    boolean, default false");
    println!("    HEARTBEAT_STALE_SEC        default 600");
    println!("    RESTARTING_STUCK_SEC       default 600");
    println!("    STALE_MARKER_MIN_AGE_SEC   default 120");
    println!("    DISCORD_WEBHOOK_URL        optional notification endpoint");
    println!("    PORT                       HTTP listen port, default 8080");
    println!("    RUST_LOG                   tracing-subscriber env filter, default info");
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}
