//! Fetch new assets from the mirror.

use anyhow::Result;

use crate::context::AppContext;

/// Run the pull command.
pub async fn run(ctx: &AppContext, propagate_deletions: bool) -> Result<()> {
    let reconciler = ctx.reconciler()?;
    let outcome = reconciler
        .pull_remote(&ctx.library, propagate_deletions)
        .await?;

    println!("Added {} assets", outcome.added);
    if propagate_deletions {
        println!("Removed {} assets", outcome.removed);
    }
    Ok(())
}
