//! The asset library facade.

use std::collections::HashSet;
use std::path::Path;

use stash_store::{BlobStore, FsBlobStore, MetadataStore, SqliteMetadataStore};
use stash_types::{AssetKind, AssetRecord, LocalId, SyncStatus};

use crate::config::LibraryConfig;
use crate::error::{LibraryError, Result};
use crate::importer::{AssetImporter, ImportFile, ImportOptions};

/// Displayable content for a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// Whether `bytes` is the thumbnail rather than the original.
    pub is_thumbnail: bool,
}

/// The on-disk library: a blob directory plus a SQLite database.
pub type FsLibrary = AssetLibrary<FsBlobStore, SqliteMetadataStore>;

/// A local media library backed by a blob store and a metadata store.
#[derive(Debug)]
pub struct AssetLibrary<B, M> {
    blobs: B,
    metadata: M,
    importer: AssetImporter,
}

impl AssetLibrary<FsBlobStore, SqliteMetadataStore> {
    /// Open the on-disk library under `data_dir`.
    ///
    /// The database is opened lazily on first use.
    pub fn open(data_dir: &Path, config: &LibraryConfig) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| LibraryError::DataDir {
            path: data_dir.to_path_buf(),
            source: e,
        })?;
        let blobs = FsBlobStore::with_directory(data_dir, config.storage.directory.clone());
        let metadata = SqliteMetadataStore::new(&data_dir.join(&config.storage.database));
        Ok(Self::new(blobs, metadata, ImportOptions::from(config)))
    }
}

impl<B: BlobStore, M: MetadataStore> AssetLibrary<B, M> {
    /// Compose a library from explicit stores.
    pub fn new(blobs: B, metadata: M, options: ImportOptions) -> Self {
        Self {
            blobs,
            metadata,
            importer: AssetImporter::new(options),
        }
    }

    /// The blob store.
    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// The metadata store.
    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    /// Import one file and return its key.
    pub async fn import(&self, file: ImportFile) -> Result<LocalId> {
        let record = self
            .importer
            .import(&self.blobs, &self.metadata, file)
            .await?;
        record.local_id.ok_or(LibraryError::Store(stash_store::StoreError::Unpersisted))
    }

    /// Import files one after another, returning their keys in order.
    ///
    /// Stops at the first hard failure; files imported before it stay.
    pub async fn import_all(&self, files: Vec<ImportFile>) -> Result<Vec<LocalId>> {
        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            ids.push(self.import(file).await?);
        }
        Ok(ids)
    }

    /// Every record, newest first.
    pub async fn list(&self) -> Result<Vec<AssetRecord>> {
        let mut records = self.metadata.list_all_ordered_by_creation().await?;
        records.reverse();
        Ok(records)
    }

    /// Look up one record.
    pub async fn get(&self, local_id: LocalId) -> Result<Option<AssetRecord>> {
        Ok(self.metadata.get(local_id).await?)
    }

    /// Original content of a record, if downloaded and still present.
    pub async fn content(&self, record: &AssetRecord) -> Result<Option<Vec<u8>>> {
        if !record.is_downloaded() {
            return Ok(None);
        }
        let bytes = self.blobs.read(&record.blob_handle).await?;
        if bytes.is_none() {
            tracing::warn!(
                "Blob {} for {} is missing",
                record.blob_handle,
                record.display_name
            );
        }
        Ok(bytes)
    }

    /// Thumbnail bytes and MIME type, if the record has a readable one.
    pub async fn thumbnail(&self, record: &AssetRecord) -> Result<Option<(Vec<u8>, String)>> {
        let (Some(handle), Some(mime)) = (&record.thumbnail_handle, &record.thumbnail_mime_type)
        else {
            return Ok(None);
        };
        Ok(self
            .blobs
            .read(handle)
            .await?
            .map(|bytes| (bytes, mime.clone())))
    }

    /// Something displayable for a record.
    ///
    /// Prefers the thumbnail and falls back to the original for images.
    pub async fn preview(&self, record: &AssetRecord) -> Result<Option<Preview>> {
        if let Some((bytes, mime_type)) = self.thumbnail(record).await? {
            return Ok(Some(Preview {
                bytes,
                mime_type,
                is_thumbnail: true,
            }));
        }
        if record.kind != AssetKind::Image {
            return Ok(None);
        }
        Ok(self.content(record).await?.map(|bytes| Preview {
            bytes,
            mime_type: record.mime_type.clone(),
            is_thumbnail: false,
        }))
    }

    /// Delete a record and its blobs. Returns whether the record existed.
    pub async fn delete(&self, local_id: LocalId) -> Result<bool> {
        let Some(record) = self.metadata.get(local_id).await? else {
            return Ok(false);
        };
        self.remove(&record).await?;
        Ok(true)
    }

    /// Remove a record, then its blobs.
    ///
    /// A blob that fails to delete is left as an orphan for
    /// [`purge_orphans`](Self::purge_orphans).
    pub async fn remove(&self, record: &AssetRecord) -> Result<()> {
        let local_id = record.local_id.ok_or(stash_store::StoreError::Unpersisted)?;
        self.metadata.delete(local_id).await?;
        for handle in record.blob_handles() {
            if let Err(e) = self.blobs.delete(handle).await {
                tracing::warn!("Failed to delete blob {}: {}", handle, e);
            }
        }
        tracing::info!("Deleted {} ({})", record.display_name, local_id);
        Ok(())
    }

    /// Mark a record `pending` so the next sync pass uploads it.
    pub async fn queue_for_sync(&self, local_id: LocalId) -> Result<()> {
        let mut record = self
            .metadata
            .get(local_id)
            .await?
            .ok_or(LibraryError::NotFound(local_id))?;
        if record.sync_status == Some(SyncStatus::Synced) {
            return Ok(());
        }
        record.sync_status = Some(SyncStatus::Pending);
        record.sync_error = None;
        record.updated_at = stash_types::now_millis();
        self.metadata.update(&record).await?;
        Ok(())
    }

    /// Blob handles that no record references.
    ///
    /// A blob written by an import still in flight looks orphaned, so do not
    /// run this concurrently with imports.
    pub async fn orphaned_blobs(&self) -> Result<Vec<String>> {
        let records = self.metadata.list_all_ordered_by_creation().await?;
        let referenced: HashSet<&str> = records.iter().flat_map(|r| r.blob_handles()).collect();
        let handles = self.blobs.list_handles().await?;
        Ok(handles
            .into_iter()
            .filter(|h| !referenced.contains(h.as_str()))
            .collect())
    }

    /// Delete every orphaned blob and return how many were removed.
    pub async fn purge_orphans(&self) -> Result<usize> {
        let orphans = self.orphaned_blobs().await?;
        for handle in &orphans {
            self.blobs.delete(handle).await?;
            tracing::debug!("Purged orphaned blob {}", handle);
        }
        if !orphans.is_empty() {
            tracing::info!("Purged {} orphaned blobs", orphans.len());
        }
        Ok(orphans.len())
    }
}
