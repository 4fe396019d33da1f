//! Error types for stash-library.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors from library operations.
///
/// Degraded outcomes (missing thumbnail, missing blob on read) are not
/// errors; they surface as `None`.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Blob or metadata store failure.
    #[error("store error: {0}")]
    Store(#[from] stash_store::StoreError),

    /// Reading an input file failed.
    #[error("failed to read {path}: {source}")]
    ReadFile {
        /// Path of the input file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The data directory could not be created.
    #[error("failed to create data directory {path}: {source}")]
    DataDir {
        /// Path of the data directory.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No record with this key.
    #[error("asset not found: {0}")]
    NotFound(stash_types::LocalId),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, LibraryError>;
