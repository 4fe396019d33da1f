//! Import files into the library.

use anyhow::{Context, Result};
use stash_library::ImportFile;
use std::path::PathBuf;

use crate::context::AppContext;

/// Run the import command.
pub async fn run(ctx: &AppContext, files: &[PathBuf]) -> Result<()> {
    for path in files {
        let file = ImportFile::from_path(path).await?;
        let name = file.name.clone();
        let id = ctx
            .library
            .import(file)
            .await
            .with_context(|| format!("Failed to import {}", path.display()))?;
        println!("Imported {} as #{}", name, id);
    }
    Ok(())
}
