//! Error types for stash-store.

use thiserror::Error;

/// Errors that can occur during storage operations.
///
/// A missing blob is not an error; see [`BlobStore::read`](crate::BlobStore::read).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Blob directory I/O failed.
    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A persisted row could not be decoded into a record.
    #[error("invalid record {local_id}: {reason}")]
    InvalidRecord {
        /// Key of the offending row.
        local_id: i64,
        /// Why decoding failed.
        reason: String,
    },

    /// No record with this key.
    #[error("record not found: {local_id}")]
    NotFound {
        /// The missing key.
        local_id: i64,
    },

    /// An update was attempted on a record that was never persisted.
    #[error("record has no local id")]
    Unpersisted,

    /// Could not allocate an unused blob handle.
    #[error("could not allocate a unique handle for {name_hint} after {attempts} attempts")]
    HandleExhausted {
        /// The name hint that was used.
        name_hint: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// Store backend failure not covered above.
    #[error("store error: {0}")]
    Backend(String),
}
