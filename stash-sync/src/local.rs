//! The local side of reconciliation.

use async_trait::async_trait;
use stash_library::{AssetLibrary, LibraryError};
use stash_store::{BlobStore, MetadataStore};
use stash_types::{AssetRecord, LocalId, SyncStatus};

/// What the reconciler needs from the local library.
#[async_trait]
pub trait LocalAssets: Send + Sync {
    /// Every local record, synced or not.
    async fn all_assets(&self) -> Result<Vec<AssetRecord>, LibraryError>;

    /// Records in `pending`, `error` or `syncing` state, oldest first.
    ///
    /// A record still `syncing` was interrupted mid-upload.
    async fn pending_assets(&self) -> Result<Vec<AssetRecord>, LibraryError>;

    /// Persist a new record.
    async fn add_asset(&self, record: &AssetRecord) -> Result<LocalId, LibraryError>;

    /// Persist changes to an existing record.
    async fn update_asset(&self, record: &AssetRecord) -> Result<(), LibraryError>;

    /// Remove a record and its blobs.
    async fn remove_asset(&self, record: &AssetRecord) -> Result<(), LibraryError>;

    /// Read one blob; `None` if it is missing.
    async fn read_blob(&self, handle: &str) -> Result<Option<Vec<u8>>, LibraryError>;

    /// Store downloaded content and return its handle.
    async fn save_blob(&self, bytes: &[u8], name_hint: &str) -> Result<String, LibraryError>;

    /// Delete one blob. Deleting a missing blob succeeds.
    async fn delete_blob(&self, handle: &str) -> Result<(), LibraryError>;
}

#[async_trait]
impl<B: BlobStore, M: MetadataStore> LocalAssets for AssetLibrary<B, M> {
    async fn all_assets(&self) -> Result<Vec<AssetRecord>, LibraryError> {
        Ok(self.metadata().list_all_ordered_by_creation().await?)
    }

    async fn pending_assets(&self) -> Result<Vec<AssetRecord>, LibraryError> {
        Ok(self
            .metadata()
            .list_by_status(&[SyncStatus::Pending, SyncStatus::Error, SyncStatus::Syncing])
            .await?)
    }

    async fn add_asset(&self, record: &AssetRecord) -> Result<LocalId, LibraryError> {
        Ok(self.metadata().insert(record).await?)
    }

    async fn update_asset(&self, record: &AssetRecord) -> Result<(), LibraryError> {
        Ok(self.metadata().update(record).await?)
    }

    async fn remove_asset(&self, record: &AssetRecord) -> Result<(), LibraryError> {
        self.remove(record).await
    }

    async fn read_blob(&self, handle: &str) -> Result<Option<Vec<u8>>, LibraryError> {
        Ok(self.blobs().read(handle).await?)
    }

    async fn save_blob(&self, bytes: &[u8], name_hint: &str) -> Result<String, LibraryError> {
        Ok(self.blobs().save(bytes, name_hint).await?)
    }

    async fn delete_blob(&self, handle: &str) -> Result<(), LibraryError> {
        Ok(self.blobs().delete(handle).await?)
    }
}
