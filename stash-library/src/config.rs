//! Configuration loading for the asset library.
//!
//! Configuration is loaded from a TOML file (default: `mediastash.toml`).
//! Every section and field is optional.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryConfig {
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Thumbnail configuration.
    #[serde(default)]
    pub thumbnails: ThumbnailConfig,
    /// Remote mirror configuration.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Name of the blob directory (default: `media-library`).
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Metadata database file name (default: `media-library.db`).
    #[serde(default = "default_database")]
    pub database: String,
}

/// Thumbnail configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ThumbnailConfig {
    /// Generate dimensions and thumbnails for images (default: true).
    #[serde(default = "default_thumbnails_enabled")]
    pub enabled: bool,
    /// Bound on a thumbnail's larger side in pixels (default: 256).
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
}

/// Remote mirror configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the remote mirror, e.g. `https://media.example.com/api`.
    pub base_url: Option<String>,
    /// Auto-sync interval in seconds (default: 60).
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
    /// Queue new imports for upload and allow auto-sync (default: false).
    #[serde(default)]
    pub enabled: bool,
}

// Default value functions
fn default_directory() -> String {
    stash_store::DEFAULT_DIRECTORY.to_string()
}

fn default_database() -> String {
    "media-library.db".to_string()
}

fn default_thumbnails_enabled() -> bool {
    true
}

fn default_max_dimension() -> u32 {
    stash_media::DEFAULT_MAX_DIMENSION
}

fn default_sync_interval() -> u64 {
    60
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            database: default_database(),
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            enabled: default_thumbnails_enabled(),
            max_dimension: default_max_dimension(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            interval_secs: default_sync_interval(),
            enabled: false,
        }
    }
}

impl SyncConfig {
    /// Auto-sync period, at least one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl LibraryConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LibraryConfig::default();
        assert_eq!(config.storage.directory, "media-library");
        assert_eq!(config.thumbnails.max_dimension, 256);
        assert!(config.thumbnails.enabled);
        assert!(!config.sync.enabled);
        assert!(config.sync.base_url.is_none());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[storage]
directory = "uploads"
database = "assets.db"

[thumbnails]
max_dimension = 128

[sync]
base_url = "https://media.example.com/api"
interval_secs = 300
enabled = true
"#;

        let config: LibraryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.storage.directory, "uploads");
        assert_eq!(config.storage.database, "assets.db");
        assert_eq!(config.thumbnails.max_dimension, 128);
        assert!(config.thumbnails.enabled);
        assert_eq!(
            config.sync.base_url.as_deref(),
            Some("https://media.example.com/api")
        );
        assert_eq!(config.sync.interval_secs, 300);
        assert!(config.sync.enabled);
    }

    #[test]
    fn sync_interval_is_at_least_one_second() {
        let mut sync = SyncConfig::default();
        assert_eq!(sync.interval(), Duration::from_secs(60));
        sync.interval_secs = 0;
        assert_eq!(sync.interval(), Duration::from_secs(1));
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let config: LibraryConfig = toml::from_str("").unwrap();
        assert_eq!(config.storage.database, "media-library.db");
        assert_eq!(config.sync.interval_secs, 60);

        let config: LibraryConfig = toml::from_str("[thumbnails]\nenabled = false\n").unwrap();
        assert!(!config.thumbnails.enabled);
        assert_eq!(config.thumbnails.max_dimension, 256);
    }

    #[test]
    fn from_file_reports_path_on_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");
        let err = LibraryConfig::from_file(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));

        let bad = tmp.path().join("bad.toml");
        std::fs::write(&bad, "[storage\n").unwrap();
        let err = LibraryConfig::from_file(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }
}
