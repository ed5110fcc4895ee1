// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn dry_run_never_reaches_the_network() {
    // An unroutable URL would hang/error if the adapter actually sent a
    // request; dry-run must short-circuit before that point.
    let adapter = DiscordNotifyAdapter::new("http://127.0.0.1:0/webhook", true);
    let result = adapter.notify("Run restarted", "trainer-run1 moved to RESTARTING").await;
    assert!(result.is_ok());
}
