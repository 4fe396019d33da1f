//! Error types for stash-types.

use thiserror::Error;

/// Errors produced when parsing persisted type representations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// Unknown sync status string.
    #[error("unknown sync status: {0}")]
    UnknownSyncStatus(String),

    /// Unknown asset kind string.
    #[error("unknown asset kind: {0}")]
    UnknownKind(String),
}
