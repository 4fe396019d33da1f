//! Upload pending assets.

use anyhow::Result;

use crate::context::AppContext;

/// Run the sync command.
///
/// Assets never considered for sync are queued first.
pub async fn run(ctx: &AppContext) -> Result<()> {
    let reconciler = ctx.reconciler()?;

    let mut queued = 0;
    for record in ctx.library.list().await? {
        if record.sync_status.is_some() || !record.is_downloaded() {
            continue;
        }
        if let Some(id) = record.local_id {
            ctx.library.queue_for_sync(id).await?;
            queued += 1;
        }
    }
    if queued > 0 {
        println!("Queued {} assets", queued);
    }

    let outcome = reconciler.sync_pending(&ctx.library).await?;
    println!(
        "Uploaded {} assets, {} failed",
        outcome.uploaded, outcome.failed
    );
    Ok(())
}
