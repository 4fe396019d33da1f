//! Delete an asset.

use anyhow::{Context, Result};
use stash_types::LocalId;

use crate::context::AppContext;

/// Run the delete command.
///
/// Synced assets are deleted on the mirror first.
pub async fn run(ctx: &AppContext, id: i64) -> Result<()> {
    let local_id = LocalId::new(id);
    let record = ctx
        .library
        .get(local_id)
        .await?
        .with_context(|| format!("No asset #{}", id))?;

    if record.remote_id.is_some() {
        let reconciler = ctx
            .reconciler()
            .context("Asset is synced; a mirror is needed to delete it")?;
        reconciler.delete_asset(&ctx.library, &record).await?;
    } else {
        ctx.library.remove(&record).await?;
    }

    println!("Deleted #{} {}", id, record.display_name);
    Ok(())
}
