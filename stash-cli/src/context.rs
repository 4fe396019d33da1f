//! Library, configuration and mirror setup shared by every command.

use anyhow::{Context, Result};
use stash_library::{AssetLibrary, FsLibrary, LibraryConfig};
use stash_sync::{HttpMirror, StaticIdentity, SyncReconciler};
use std::path::{Path, PathBuf};

/// Configuration file looked up in the data directory.
const CONFIG_FILE: &str = "mediastash.toml";

/// Everything a command needs.
pub struct AppContext {
    /// Loaded configuration.
    pub config: LibraryConfig,
    /// The on-disk library.
    pub library: FsLibrary,
    identity: Option<String>,
}

impl AppContext {
    /// Load configuration and open the library under `data_dir`.
    pub fn load(
        data_dir: PathBuf,
        config: Option<&Path>,
        identity: Option<String>,
    ) -> Result<Self> {
        let config = match config {
            Some(path) => LibraryConfig::from_file(path)?,
            None => {
                let default = data_dir.join(CONFIG_FILE);
                if default.is_file() {
                    LibraryConfig::from_file(&default)?
                } else {
                    LibraryConfig::default()
                }
            }
        };

        let library = AssetLibrary::open(&data_dir, &config)
            .with_context(|| format!("Failed to open library in {}", data_dir.display()))?;

        Ok(Self {
            config,
            library,
            identity,
        })
    }

    /// A reconciler for the configured mirror.
    ///
    /// Without `--identity` the reconciler is anonymous and every sync
    /// operation fails with "not authenticated".
    pub fn reconciler(&self) -> Result<SyncReconciler<HttpMirror, StaticIdentity>> {
        let base_url = self
            .config
            .sync
            .base_url
            .as_deref()
            .context("No mirror configured. Set [sync] base_url in mediastash.toml.")?;
        let identity = match &self.identity {
            Some(token) => StaticIdentity::new(token.clone()),
            None => StaticIdentity::anonymous(),
        };
        Ok(SyncReconciler::new(HttpMirror::new(base_url), identity))
    }
}
