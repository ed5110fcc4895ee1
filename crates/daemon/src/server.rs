// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP entry point: a single route that triggers a full reconciliation
//! pass and reports its actions, plus a cloud-event compatible route whose
//! payload is ignored. Both wrap the same `reconcile_all` call.
//!
//! Generic over the adapter types so the test suite can mount the same
//! router over fakes; [`DaemonEngine`]/[`build_engine`] fix the production
//! instantiation used by `main`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use reconciler_compute::{ComputeAdapter, GceComputeAdapter};
use reconciler_core::{Clock, SystemClock, TransitionTable};
use reconciler_engine::ReconcileEngine;
use reconciler_notify::NotifyAdapter;
use reconciler_store::{GcsStoreAdapter, StoreAdapter};
use serde_json::{json, Value};

use crate::config::Config;
use crate::notify_adapter::AnyNotifyAdapter;

/// Concrete engine type wired to the production adapters.
pub type DaemonEngine = ReconcileEngine<GcsStoreAdapter, GceComputeAdapter, AnyNotifyAdapter, SystemClock>;

/// Builds the production engine from a resolved [`Config`].
pub fn build_engine(config: &Config) -> DaemonEngine {
    let store = GcsStoreAdapter::new(config.engine.bucket.clone());
    let compute = GceComputeAdapter::new();
    let notify = AnyNotifyAdapter::from_webhook_url(config.discord_webhook_url.clone(), config.engine.dry_run);

    ReconcileEngine::new(store, compute, notify, TransitionTable::load(), SystemClock, config.engine.clone())
}

/// Runs one full reconciliation pass and renders it as the `{status, actions}`
/// response body shared by the HTTP and cloud-event entry points.
pub async fn reconcile_all_json<S, C, N, CL>(engine: &ReconcileEngine<S, C, N, CL>) -> Value
where
    S: StoreAdapter,
    C: ComputeAdapter,
    N: NotifyAdapter,
    CL: Clock,
{
    let actions = match engine.reconcile_all().await {
        Ok(actions) => actions,
        Err(e) => {
            tracing::error!(error = %e, "reconcile_all returned an error it should have swallowed internally");
            Default::default()
        }
    };

    json!({
        "status": "ok",
        "actions": actions.into_iter().map(|(run_id, action)| (run_id, action.to_string())).collect::<std::collections::BTreeMap<_, _>>(),
    })
}

async fn handle_reconcile<S, C, N, CL>(State(engine): State<Arc<ReconcileEngine<S, C, N, CL>>>) -> (StatusCode, Json<Value>)
where
    S: StoreAdapter,
    C: ComputeAdapter,
    N: NotifyAdapter,
    CL: Clock,
{
    (StatusCode::OK, Json(reconcile_all_json(&engine).await))
}

async fn handle_cloud_event<S, C, N, CL>(State(engine): State<Arc<ReconcileEngine<S, C, N, CL>>>) -> StatusCode
where
    S: StoreAdapter,
    C: ComputeAdapter,
    N: NotifyAdapter,
    CL: Clock,
{
    let _ = reconcile_all_json(&engine).await;
    StatusCode::OK
}

async fn handle_healthz() -> StatusCode {
    StatusCode::OK
}

/// Builds the axum router: `POST /reconcile` for direct triggers, `POST
/// /` for cloud-event delivery (Cloud Scheduler/Pub/Sub push the event
/// envelope there and ignore the body), and `GET /healthz` for liveness
/// probes.
pub fn build_router<S, C, N, CL>(engine: Arc<ReconcileEngine<S, C, N, CL>>) -> Router
where
    S: StoreAdapter,
    C: ComputeAdapter,
    N: NotifyAdapter,
    CL: Clock,
{
    Router::new()
        .route("/reconcile", post(handle_reconcile))
        .route("/", post(handle_cloud_event))
        .route("/healthz", axum::routing::get(handle_healthz))
        .with_state(engine)
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
