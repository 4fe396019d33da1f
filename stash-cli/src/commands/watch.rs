//! Watch command - upload pending assets on a timer until interrupted.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use stash_sync::AutoSync;

use crate::context::AppContext;

/// Run the watch command.
///
/// Runs one upload pass right away, then every `[sync] interval_secs`.
pub async fn run(ctx: AppContext) -> Result<()> {
    if !ctx.config.sync.enabled {
        bail!("Auto-sync is disabled. Set [sync] enabled = true in mediastash.toml.");
    }
    let reconciler = Arc::new(ctx.reconciler()?);
    let period = ctx.config.sync.interval();
    let library = Arc::new(ctx.library);

    let outcome = reconciler.sync_pending(library.as_ref()).await?;
    println!(
        "Uploaded {} assets, {} failed",
        outcome.uploaded, outcome.failed
    );

    let mut auto = AutoSync::new();
    auto.start(reconciler, library, period);

    println!("Syncing every {}s. Press Ctrl+C to stop.", period.as_secs());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    println!();
    println!("Shutting down...");
    auto.stop();
    println!("Done.");

    Ok(())
}
