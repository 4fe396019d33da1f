//! # mediastash
//!
//! Command-line front end for a local media library.
//!
//! ## Commands
//!
//! - `import`: Import files into the library
//! - `list`: List assets, newest first
//! - `delete`: Delete an asset (and its remote copy, if synced)
//! - `sync`: Upload pending assets to the mirror
//! - `pull`: Fetch new assets from the mirror
//! - `purge-orphans`: Remove blobs no record references
//! - `watch`: Upload pending assets on a timer until interrupted
//!
//! ## Example
//!
//! ```bash
//! mediastash import holiday.jpg notes.pdf
//! mediastash list
//!
//! export MEDIASTASH_IDENTITY=token
//! mediastash sync
//! mediastash pull --propagate-deletions
//! mediastash watch
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod context;

use commands::{delete, import, list, purge, pull, sync, watch};
use context::AppContext;

/// Command-line front end for a local media library.
#[derive(Parser, Debug)]
#[command(name = "mediastash")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory holding the blob directory and metadata database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (default: <data-dir>/mediastash.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Identity sent to the remote mirror
    #[arg(long, global = true, env = "MEDIASTASH_IDENTITY", hide_env_values = true)]
    identity: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import files into the library
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List assets, newest first
    List,

    /// Delete an asset
    Delete {
        /// Local id of the asset
        id: i64,
    },

    /// Upload pending assets to the remote mirror
    Sync,

    /// Fetch new assets from the remote mirror
    Pull {
        /// Also remove local assets the mirror no longer has
        #[arg(long)]
        propagate_deletions: bool,
    },

    /// Remove blobs that no asset references
    PurgeOrphans,

    /// Upload pending assets every `[sync] interval_secs` until Ctrl+C
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let ctx = AppContext::load(data_dir, cli.config.as_deref(), cli.identity)?;

    match cli.command {
        Commands::Import { files } => {
            import::run(&ctx, &files).await?;
        }
        Commands::List => {
            list::run(&ctx).await?;
        }
        Commands::Delete { id } => {
            delete::run(&ctx, id).await?;
        }
        Commands::Sync => {
            sync::run(&ctx).await?;
        }
        Commands::Pull {
            propagate_deletions,
        } => {
            pull::run(&ctx, propagate_deletions).await?;
        }
        Commands::PurgeOrphans => {
            purge::run(&ctx).await?;
        }
        Commands::Watch => {
            watch::run(ctx).await?;
        }
    }

    Ok(())
}

/// Get the default data directory for mediastash.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "ydun", "mediastash")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
