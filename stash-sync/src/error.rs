//! Error types for stash-sync.

use stash_library::LibraryError;
use thiserror::Error;

/// Errors from a remote mirror.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Transport or body decoding failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The mirror answered with a non-success status.
    #[error("mirror returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// No remote asset with this id or locator.
    #[error("remote asset not found: {0}")]
    NotFound(String),

    /// A mirror URL could not be built.
    #[error("invalid mirror url: {0}")]
    InvalidUrl(String),

    /// The mirror refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Errors from sync operations.
///
/// Upload and pull failures are recorded or logged rather than returned;
/// these are the hard failures left over.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The identity provider returned no identity.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The asset claims content the blob store does not have.
    #[error("blob {handle} is missing")]
    MissingBlob {
        /// Blob handle the record points at.
        handle: String,
    },

    /// The asset has not been downloaded, so there is nothing to upload.
    #[error("asset {name} has no local content")]
    NotDownloaded {
        /// Display name of the asset.
        name: String,
    },

    /// Deleting a remote asset failed.
    #[error("failed to delete remote asset {remote_id}: {source}")]
    RemoteDelete {
        /// Remote identity of the asset.
        remote_id: String,
        /// Underlying mirror error.
        source: MirrorError,
    },

    /// Local library failure.
    #[error("local library error: {0}")]
    Local(#[from] LibraryError),
}

impl From<stash_store::StoreError> for SyncError {
    fn from(e: stash_store::StoreError) -> Self {
        Self::Local(LibraryError::Store(e))
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
