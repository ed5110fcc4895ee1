// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Picks between the Discord webhook adapter and the silent no-op adapter
//! based on whether `DISCORD_WEBHOOK_URL` is configured, behind a single
//! concrete type so the engine's generic parameters stay simple.

use async_trait::async_trait;
use reconciler_notify::{DiscordNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter, NotifyError};

#[derive(Clone)]
pub enum AnyNotifyAdapter {
    Discord(DiscordNotifyAdapter),
    NoOp(NoOpNotifyAdapter),
}

impl AnyNotifyAdapter {
    pub fn from_webhook_url(webhook_url: Option<String>, dry_run: bool) -> Self {
        match webhook_url {
            Some(url) => Self::Discord(DiscordNotifyAdapter::new(url, dry_run)),
            None => Self::NoOp(NoOpNotifyAdapter::new()),
        }
    }
}

#[async_trait]
impl NotifyAdapter for AnyNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        match self {
            Self::Discord(a) => a.notify(title, message).await,
            Self::NoOp(a) => a.notify(title, message).await,
        }
    }
}
