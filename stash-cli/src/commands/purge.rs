//! Remove orphaned blobs.

use anyhow::Result;

use crate::context::AppContext;

/// Run the purge-orphans command.
pub async fn run(ctx: &AppContext) -> Result<()> {
    let purged = ctx.library.purge_orphans().await?;
    println!("Removed {} orphaned blobs", purged);
    Ok(())
}
