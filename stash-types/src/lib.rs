//! # stash-types
//!
//! Foundational types shared by every mediastash crate:
//! - [`AssetRecord`] - one imported file plus its sync state
//! - [`AssetKind`], [`SyncStatus`] - closed classifications of a record
//! - [`LocalId`] - the metadata store's auto-assigned key
//! - [`RemoteAsset`] - the remote mirror's per-asset JSON shape

#![warn(missing_docs)]
#![warn(clippy::all)]

mod asset;
mod error;
mod ids;
mod remote;

pub use asset::{AssetKind, AssetRecord, SyncStatus};
pub use error::TypeError;
pub use ids::LocalId;
pub use remote::RemoteAsset;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
