//! Metadata storage for asset records.
//!
//! Provides record persistence ordered by creation time.

mod sqlite;

pub use sqlite::{SqliteMetadataStore, SCHEMA_VERSION};

use crate::error::StoreError;
use async_trait::async_trait;
use stash_types::{AssetRecord, LocalId, SyncStatus};

/// Trait for asset record storage backends.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Open the underlying database.
    ///
    /// Idempotent: every caller shares one connection, opened on first use.
    /// Other operations open implicitly, so calling this is optional.
    async fn open(&self) -> Result<(), StoreError>;

    /// Persist a new record and return its assigned key.
    ///
    /// Any `local_id` already set on `record` is ignored.
    async fn insert(&self, record: &AssetRecord) -> Result<LocalId, StoreError>;

    /// Look up one record.
    async fn get(&self, local_id: LocalId) -> Result<Option<AssetRecord>, StoreError>;

    /// Overwrite a persisted record's mutable fields.
    ///
    /// `created_at` is never rewritten. Returns `NotFound` if the record
    /// has been deleted and `Unpersisted` if it has no key.
    async fn update(&self, record: &AssetRecord) -> Result<(), StoreError>;

    /// Delete one record. Deleting a missing key succeeds.
    async fn delete(&self, local_id: LocalId) -> Result<(), StoreError>;

    /// Every record, ascending by `created_at`.
    ///
    /// Callers wanting newest-first reverse the result.
    async fn list_all_ordered_by_creation(&self) -> Result<Vec<AssetRecord>, StoreError>;

    /// Records whose sync status is one of `statuses`, ascending by `created_at`.
    async fn list_by_status(&self, statuses: &[SyncStatus])
        -> Result<Vec<AssetRecord>, StoreError>;
}
