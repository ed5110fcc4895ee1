// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discord webhook notification adapter.
//!
//! Posts a single-embed message to a Discord incoming webhook URL. When
//! `dry_run` is set, the title is prefixed with `[DRY-RUN]` and the message
//! is logged instead of sent, matching the process-wide dry-run convention
//! an operator watching a dry-run instance should see exactly
//! the notifications a live run would have produced, clearly marked.

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Outbound notification sends get a short timeout; a slow or unreachable
/// webhook must never hold up a reconcile pass.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct DiscordNotifyAdapter {
    client: Client,
    webhook_url: String,
    dry_run: bool,
}

impl DiscordNotifyAdapter {
    pub fn new(webhook_url: impl Into<String>, dry_run: bool) -> Self {
        let client = Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            webhook_url: webhook_url.into(),
            dry_run,
        }
    }
}

#[async_trait]
impl NotifyAdapter for DiscordNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let title = if self.dry_run {
            format!("[DRY-RUN] {title}")
        } else {
            title.to_string()
        };

        if self.dry_run {
            tracing::info!(%title, %message, "dry-run: suppressing discord webhook send");
            return Ok(());
        }

        let body = serde_json::json!({
            "embeds": [{ "title": title, "description": message }],
        });

        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NotifyError::SendFailed(format!(
                "discord webhook returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "discord_tests.rs"]
mod tests;
