//! Reconciles local assets against a remote mirror.
//!
//! Per-asset upload state machine:
//!
//! ```text
//! (none) ──queue──► pending ──► syncing ──┬──► synced
//!                      ▲                  │
//!                      └──── error ◄──────┘
//! ```
//!
//! Only `pending` and `error` assets are uploaded, one at a time, plus
//! `syncing` ones a crashed pass left behind. A failed upload is retried
//! verbatim on the next pass with no backoff.

use std::collections::HashSet;

use stash_types::{now_millis, AssetRecord, RemoteAsset, SyncStatus};

use crate::error::{Result, SyncError};
use crate::identity::IdentityProvider;
use crate::local::LocalAssets;
use crate::mirror::{RemoteMirror, UploadRequest};

/// Result of an upload pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Assets that reached `synced`.
    pub uploaded: usize,
    /// Assets left in `error`.
    pub failed: usize,
}

/// Result of a pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullOutcome {
    /// Remote assets added as new local records.
    pub added: usize,
    /// Local records removed because the remote no longer has them.
    pub removed: usize,
}

/// Drives uploads, pulls, downloads and deletions against a mirror.
#[derive(Debug)]
pub struct SyncReconciler<R, I> {
    mirror: R,
    identity: I,
}

impl<R: RemoteMirror, I: IdentityProvider> SyncReconciler<R, I> {
    /// Create a reconciler.
    pub fn new(mirror: R, identity: I) -> Self {
        Self { mirror, identity }
    }

    /// The remote mirror.
    pub fn mirror(&self) -> &R {
        &self.mirror
    }

    async fn require_identity(&self) -> Result<String> {
        self.identity
            .identity()
            .await
            .ok_or(SyncError::NotAuthenticated)
    }

    /// Upload one asset, recording the outcome on `asset`.
    ///
    /// Returns `Ok(true)` when the asset is now `synced` and `Ok(false)` when
    /// the upload failed and `asset` carries `error` with the message. The
    /// caller persists `asset`.
    ///
    /// Missing identity, an undownloaded asset or a missing blob are hard
    /// errors and leave `asset` untouched.
    pub async fn upload_one<L>(&self, local: &L, asset: &mut AssetRecord) -> Result<bool>
    where
        L: LocalAssets + ?Sized,
    {
        let identity = self.require_identity().await?;
        self.upload_as(&identity, local, asset).await
    }

    async fn upload_as<L>(&self, identity: &str, local: &L, asset: &mut AssetRecord) -> Result<bool>
    where
        L: LocalAssets + ?Sized,
    {
        if !asset.is_downloaded() {
            return Err(SyncError::NotDownloaded {
                name: asset.display_name.clone(),
            });
        }
        let bytes = local
            .read_blob(&asset.blob_handle)
            .await?
            .ok_or_else(|| SyncError::MissingBlob {
                handle: asset.blob_handle.clone(),
            })?;

        let request = UploadRequest::for_record(asset, bytes);
        match self.mirror.upload(identity, request).await {
            Ok(remote) => {
                let now = now_millis();
                asset.remote_id = Some(remote.id);
                asset.remote_locator = Some(remote.path);
                asset.remote_created_at = Some(remote.created_at);
                asset.owner_id = Some(identity.to_string());
                asset.sync_status = Some(SyncStatus::Synced);
                asset.sync_error = None;
                asset.synced_at = Some(now);
                asset.updated_at = now;
                tracing::info!("Uploaded {}", asset.display_name);
                Ok(true)
            }
            Err(e) => {
                tracing::warn!("Upload of {} failed: {}", asset.display_name, e);
                asset.sync_status = Some(SyncStatus::Error);
                asset.sync_error = Some(e.to_string());
                Ok(false)
            }
        }
    }

    /// Upload every `pending`, `error` or interrupted `syncing` asset, one
    /// after another.
    ///
    /// Each asset is marked `syncing` and persisted before its upload. Any
    /// failure after that puts the asset in `error` with the message, and the
    /// pass moves on. The identity is resolved first; without one nothing is
    /// read or uploaded.
    pub async fn sync_pending<L>(&self, local: &L) -> Result<SyncOutcome>
    where
        L: LocalAssets + ?Sized,
    {
        let identity = self.require_identity().await?;
        let pending = local.pending_assets().await?;
        if pending.is_empty() {
            tracing::debug!("Sync: nothing pending");
            return Ok(SyncOutcome::default());
        }

        let mut outcome = SyncOutcome::default();
        for mut asset in pending {
            asset.sync_status = Some(SyncStatus::Syncing);
            local.update_asset(&asset).await?;

            let synced = match self.upload_as(&identity, local, &mut asset).await {
                Ok(synced) => synced,
                Err(e) => {
                    tracing::error!("Cannot upload {}: {}", asset.display_name, e);
                    mark_failed(&mut asset, &e);
                    false
                }
            };
            if let Err(e) = local.update_asset(&asset).await {
                tracing::error!("Failed to record sync state of {}: {}", asset.display_name, e);
                if synced {
                    // Left `syncing`; the next pass uploads it again.
                    return Err(e.into());
                }
                mark_failed(&mut asset, &e);
                local.update_asset(&asset).await?;
            }

            if synced {
                outcome.uploaded += 1;
            } else {
                outcome.failed += 1;
            }
        }

        tracing::info!(
            "Sync: {} uploaded, {} failed",
            outcome.uploaded,
            outcome.failed
        );
        Ok(outcome)
    }

    /// Bring remote assets into the local library.
    ///
    /// Remote assets already known by remote id, or matching a local asset's
    /// `(name, size)` fingerprint, are skipped. The fingerprint is a heuristic:
    /// two different files can share it and a re-encoded copy will not. New
    /// records are `synced` with no local content until [`hydrate`](Self::hydrate).
    ///
    /// With `propagate_deletions`, local records whose remote id is no longer
    /// on the mirror are removed. Records never synced are never removed.
    ///
    /// A failed remote listing is logged and reported as zero progress.
    pub async fn pull_remote<L>(&self, local: &L, propagate_deletions: bool) -> Result<PullOutcome>
    where
        L: LocalAssets + ?Sized,
    {
        let identity = self.require_identity().await?;
        let remote = match self.mirror.list(&identity).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!("Pull: failed to list remote assets: {}", e);
                return Ok(PullOutcome::default());
            }
        };

        let existing = local.all_assets().await?;
        let mut known_ids: HashSet<String> =
            existing.iter().filter_map(|a| a.remote_id.clone()).collect();
        let mut fingerprints: HashSet<(String, u64)> = existing
            .iter()
            .map(|a| (a.display_name.clone(), a.byte_size))
            .collect();

        let mut outcome = PullOutcome::default();
        for asset in &remote {
            if known_ids.contains(&asset.id) {
                continue;
            }
            let fingerprint = (asset.file_name.clone(), asset.size);
            if fingerprints.contains(&fingerprint) {
                tracing::debug!(
                    "Pull: skipping {} ({}), matches a local asset",
                    asset.file_name,
                    asset.id
                );
                continue;
            }

            let record = pulled_record(asset, &identity);
            let local_id = local.add_asset(&record).await?;
            tracing::debug!("Pull: added {} as {}", asset.file_name, local_id);
            known_ids.insert(asset.id.clone());
            fingerprints.insert(fingerprint);
            outcome.added += 1;
        }

        if propagate_deletions {
            let remote_ids: HashSet<&str> = remote.iter().map(|a| a.id.as_str()).collect();
            for record in &existing {
                let Some(remote_id) = record.remote_id.as_deref() else {
                    continue;
                };
                if remote_ids.contains(remote_id) {
                    continue;
                }
                local.remove_asset(record).await?;
                tracing::debug!(
                    "Pull: removed {}, gone from remote",
                    record.display_name
                );
                outcome.removed += 1;
            }
        }

        if outcome.added > 0 || outcome.removed > 0 {
            tracing::info!(
                "Pull: {} added, {} removed",
                outcome.added,
                outcome.removed
            );
        }
        Ok(outcome)
    }

    /// Fetch an asset's remote content.
    ///
    /// Uses the remote id when present, otherwise the remote locator.
    /// Any mirror failure is logged and yields `None`.
    pub async fn download_one(&self, asset: &AssetRecord) -> Result<Option<Vec<u8>>> {
        let identity = self.require_identity().await?;
        let result = match (&asset.remote_id, &asset.remote_locator) {
            (Some(remote_id), _) => self.mirror.download(&identity, remote_id).await,
            (None, Some(locator)) => self.mirror.download_locator(&identity, locator).await,
            (None, None) => {
                tracing::debug!("Download of {}: no remote id or locator", asset.display_name);
                return Ok(None);
            }
        };
        match result {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => {
                tracing::warn!("Download of {} failed: {}", asset.display_name, e);
                Ok(None)
            }
        }
    }

    /// Download a pulled asset's content and persist its new blob handle.
    ///
    /// Returns the updated record, the record unchanged if it already has
    /// content, or `None` if the download or blob write failed. If the record
    /// cannot be updated, the new blob is deleted and the error returned.
    pub async fn hydrate<L>(&self, local: &L, asset: &AssetRecord) -> Result<Option<AssetRecord>>
    where
        L: LocalAssets + ?Sized,
    {
        if asset.is_downloaded() {
            return Ok(Some(asset.clone()));
        }
        let Some(bytes) = self.download_one(asset).await? else {
            return Ok(None);
        };
        let handle = match local.save_blob(&bytes, &asset.display_name).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Failed to store download of {}: {}", asset.display_name, e);
                return Ok(None);
            }
        };

        let mut updated = asset.clone();
        updated.blob_handle = handle;
        updated.updated_at = now_millis();
        if let Err(e) = local.update_asset(&updated).await {
            if let Err(cleanup) = local.delete_blob(&updated.blob_handle).await {
                tracing::warn!("Failed to delete blob {}: {}", updated.blob_handle, cleanup);
            }
            return Err(e.into());
        }
        tracing::debug!("Hydrated {}", updated.display_name);
        Ok(Some(updated))
    }

    /// Delete an asset on the mirror.
    pub async fn delete_remote(&self, remote_id: &str) -> Result<()> {
        let identity = self.require_identity().await?;
        self.mirror
            .delete(&identity, remote_id)
            .await
            .map_err(|source| SyncError::RemoteDelete {
                remote_id: remote_id.to_string(),
                source,
            })?;
        tracing::info!("Deleted remote asset {}", remote_id);
        Ok(())
    }

    /// Delete an asset everywhere.
    ///
    /// A synced asset is deleted on the mirror first; if that fails the
    /// local record is kept and the error returned.
    pub async fn delete_asset<L>(&self, local: &L, asset: &AssetRecord) -> Result<()>
    where
        L: LocalAssets + ?Sized,
    {
        if let Some(remote_id) = &asset.remote_id {
            self.delete_remote(remote_id).await?;
        }
        local.remove_asset(asset).await?;
        Ok(())
    }
}

/// Put `asset` in `error` with the message of `error`.
fn mark_failed(asset: &mut AssetRecord, error: &dyn std::fmt::Display) {
    asset.sync_status = Some(SyncStatus::Error);
    asset.sync_error = Some(error.to_string());
}

/// A new local record for a remote asset, not yet downloaded.
fn pulled_record(asset: &RemoteAsset, identity: &str) -> AssetRecord {
    let now = now_millis();
    let mut record = AssetRecord::new(&asset.file_name, &asset.mime_type, asset.size, now);
    record.remote_id = Some(asset.id.clone());
    record.owner_id = Some(identity.to_string());
    record.remote_locator = Some(asset.path.clone());
    record.remote_created_at = Some(asset.created_at.clone());
    record.width = asset.width;
    record.height = asset.height;
    record.synced_at = Some(now);
    record.sync_status = Some(SyncStatus::Synced);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use crate::mirror::MockMirror;
    use async_trait::async_trait;
    use stash_library::{AssetLibrary, ImportFile, ImportOptions, LibraryError};
    use stash_store::{MemoryBlobStore, SqliteMetadataStore, StoreError};
    use stash_types::LocalId;
    use std::sync::atomic::{AtomicBool, Ordering};

    type TestLibrary = AssetLibrary<MemoryBlobStore, SqliteMetadataStore>;

    /// A library whose blob reads or record updates can be made to fail.
    struct FlakyLocal {
        inner: TestLibrary,
        fail_reads: AtomicBool,
        fail_updates: AtomicBool,
    }

    impl FlakyLocal {
        fn new(inner: TestLibrary) -> Self {
            Self {
                inner,
                fail_reads: AtomicBool::new(false),
                fail_updates: AtomicBool::new(false),
            }
        }

        fn io_error() -> LibraryError {
            LibraryError::Store(StoreError::Io(std::io::Error::other("EIO")))
        }
    }

    #[async_trait]
    impl LocalAssets for FlakyLocal {
        async fn all_assets(&self) -> std::result::Result<Vec<AssetRecord>, LibraryError> {
            self.inner.all_assets().await
        }

        async fn pending_assets(&self) -> std::result::Result<Vec<AssetRecord>, LibraryError> {
            self.inner.pending_assets().await
        }

        async fn add_asset(
            &self,
            record: &AssetRecord,
        ) -> std::result::Result<LocalId, LibraryError> {
            self.inner.add_asset(record).await
        }

        async fn update_asset(
            &self,
            record: &AssetRecord,
        ) -> std::result::Result<(), LibraryError> {
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(Self::io_error());
            }
            self.inner.update_asset(record).await
        }

        async fn remove_asset(
            &self,
            record: &AssetRecord,
        ) -> std::result::Result<(), LibraryError> {
            self.inner.remove_asset(record).await
        }

        async fn read_blob(
            &self,
            handle: &str,
        ) -> std::result::Result<Option<Vec<u8>>, LibraryError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(Self::io_error());
            }
            self.inner.read_blob(handle).await
        }

        async fn save_blob(
            &self,
            bytes: &[u8],
            name_hint: &str,
        ) -> std::result::Result<String, LibraryError> {
            self.inner.save_blob(bytes, name_hint).await
        }

        async fn delete_blob(&self, handle: &str) -> std::result::Result<(), LibraryError> {
            self.inner.delete_blob(handle).await
        }
    }

    fn library() -> TestLibrary {
        AssetLibrary::new(
            MemoryBlobStore::new(),
            SqliteMetadataStore::in_memory().unwrap(),
            ImportOptions {
                queue_for_sync: true,
                ..ImportOptions::default()
            },
        )
    }

    fn reconciler(mirror: &MockMirror) -> SyncReconciler<MockMirror, StaticIdentity> {
        SyncReconciler::new(mirror.clone(), StaticIdentity::new("user-1"))
    }

    fn remote(id: &str, name: &str, size: u64) -> RemoteAsset {
        RemoteAsset {
            id: id.to_string(),
            path: format!("/files/{}/{}", id, name),
            created_at: "2024-02-02T00:00:00Z".to_string(),
            updated_at: "2024-02-02T00:00:00Z".to_string(),
            file_name: name.to_string(),
            file_type: "image".to_string(),
            mime_type: "image/png".to_string(),
            size,
            width: Some(4),
            height: Some(3),
        }
    }

    async fn import_text(library: &TestLibrary, name: &str) -> AssetRecord {
        let id = library
            .import(ImportFile::new(name, "text/plain", name.as_bytes().to_vec()))
            .await
            .unwrap();
        library.get(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn upload_one_merges_remote_identity() {
        let library = library();
        let mirror = MockMirror::new();
        let mut asset = import_text(&library, "a.txt").await;

        assert!(reconciler(&mirror).upload_one(&library, &mut asset).await.unwrap());
        assert_eq!(asset.sync_status, Some(SyncStatus::Synced));
        assert_eq!(asset.remote_id.as_deref(), Some("remote-1"));
        assert_eq!(asset.owner_id.as_deref(), Some("user-1"));
        assert_eq!(asset.remote_locator.as_deref(), Some("/files/remote-1/a.txt"));
        assert!(asset.synced_at.is_some());
        assert_eq!(mirror.remote_bytes("remote-1"), Some(b"a.txt".to_vec()));
    }

    #[tokio::test]
    async fn upload_failure_records_error() {
        let library = library();
        let mirror = MockMirror::new();
        let mut asset = import_text(&library, "a.txt").await;
        let before = asset.clone();

        mirror.fail_next_upload("server exploded");
        assert!(!reconciler(&mirror).upload_one(&library, &mut asset).await.unwrap());
        assert_eq!(asset.sync_status, Some(SyncStatus::Error));
        assert!(asset.sync_error.as_deref().unwrap().contains("server exploded"));
        assert_eq!(asset.remote_id, None);
        assert_eq!(asset.blob_handle, before.blob_handle);
        assert_eq!(asset.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn upload_without_identity_is_rejected() {
        let library = library();
        let mirror = MockMirror::new();
        let mut asset = import_text(&library, "a.txt").await;
        let reconciler = SyncReconciler::new(mirror.clone(), StaticIdentity::anonymous());

        let err = reconciler.upload_one(&library, &mut asset).await.unwrap_err();
        assert!(matches!(err, SyncError::NotAuthenticated));
        assert_eq!(mirror.total_calls(), 0);
    }

    #[tokio::test]
    async fn upload_with_missing_blob_is_hard_error() {
        let library = library();
        let mirror = MockMirror::new();
        let mut asset = import_text(&library, "a.txt").await;
        library.blobs().evict(&asset.blob_handle);

        let err = reconciler(&mirror)
            .upload_one(&library, &mut asset)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingBlob { .. }));
        assert_eq!(mirror.upload_calls(), 0);
    }

    #[tokio::test]
    async fn sync_pending_is_idempotent() {
        let library = library();
        let mirror = MockMirror::new();
        import_text(&library, "a.txt").await;
        import_text(&library, "b.txt").await;
        let reconciler = reconciler(&mirror);

        let first = reconciler.sync_pending(&library).await.unwrap();
        assert_eq!(first, SyncOutcome { uploaded: 2, failed: 0 });
        let calls = mirror.total_calls();

        let second = reconciler.sync_pending(&library).await.unwrap();
        assert_eq!(second, SyncOutcome::default());
        assert_eq!(mirror.total_calls(), calls);
    }

    #[tokio::test]
    async fn errored_asset_is_retried() {
        let library = library();
        let mirror = MockMirror::new();
        let asset = import_text(&library, "a.txt").await;
        let local_id = asset.local_id.unwrap();
        let reconciler = reconciler(&mirror);

        mirror.fail_next_upload("flaky");
        let outcome = reconciler.sync_pending(&library).await.unwrap();
        assert_eq!(outcome, SyncOutcome { uploaded: 0, failed: 1 });
        let stored = library.get(local_id).await.unwrap().unwrap();
        assert_eq!(stored.sync_status, Some(SyncStatus::Error));
        assert!(stored.sync_error.is_some());

        let outcome = reconciler.sync_pending(&library).await.unwrap();
        assert_eq!(outcome, SyncOutcome { uploaded: 1, failed: 0 });
        let stored = library.get(local_id).await.unwrap().unwrap();
        assert_eq!(stored.sync_status, Some(SyncStatus::Synced));
        assert!(stored.sync_error.is_none());
    }

    #[tokio::test]
    async fn sync_pending_continues_past_missing_blob() {
        let library = library();
        let mirror = MockMirror::new();
        let broken = import_text(&library, "broken.txt").await;
        import_text(&library, "fine.txt").await;
        library.blobs().evict(&broken.blob_handle);

        let outcome = reconciler(&mirror).sync_pending(&library).await.unwrap();
        assert_eq!(outcome, SyncOutcome { uploaded: 1, failed: 1 });

        let stored = library.get(broken.local_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.sync_status, Some(SyncStatus::Error));
        assert!(stored.sync_error.unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn sync_pending_without_identity_makes_no_calls() {
        let library = library();
        let mirror = MockMirror::new();
        let asset = import_text(&library, "a.txt").await;
        let reconciler = SyncReconciler::new(mirror.clone(), StaticIdentity::anonymous());

        assert!(matches!(
            reconciler.sync_pending(&library).await,
            Err(SyncError::NotAuthenticated)
        ));
        assert_eq!(mirror.total_calls(), 0);
        let stored = library.get(asset.local_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.sync_status, Some(SyncStatus::Pending));
    }

    #[tokio::test]
    async fn pull_adds_undownloaded_synced_records() {
        let library = library();
        let mirror = MockMirror::new();
        mirror.insert_remote(remote("R1", "photo.png", 12), vec![0; 12]);

        let outcome = reconciler(&mirror).pull_remote(&library, false).await.unwrap();
        assert_eq!(outcome, PullOutcome { added: 1, removed: 0 });

        let records = library.list().await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.remote_id.as_deref(), Some("R1"));
        assert_eq!(record.sync_status, Some(SyncStatus::Synced));
        assert!(!record.is_downloaded());
        assert_eq!(record.width, Some(4));
        assert_eq!(record.remote_created_at.as_deref(), Some("2024-02-02T00:00:00Z"));
    }

    #[tokio::test]
    async fn pull_dedups_by_remote_id() {
        let library = library();
        let mirror = MockMirror::new();
        mirror.insert_remote(remote("R1", "photo.png", 12), vec![0; 12]);
        let reconciler = reconciler(&mirror);

        reconciler.pull_remote(&library, false).await.unwrap();
        let again = reconciler.pull_remote(&library, false).await.unwrap();
        assert_eq!(again.added, 0);
        assert_eq!(library.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pull_dedups_by_fingerprint() {
        let library = library();
        let mirror = MockMirror::new();
        library
            .import(ImportFile::new("photo.png", "application/octet-stream", vec![0; 1024]))
            .await
            .unwrap();
        mirror.insert_remote(remote("R7", "photo.png", 1024), vec![0; 1024]);

        let outcome = reconciler(&mirror).pull_remote(&library, false).await.unwrap();
        assert_eq!(outcome.added, 0);
        assert_eq!(library.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pull_propagates_deletions_only_when_asked() {
        let library = library();
        let mirror = MockMirror::new();
        mirror.insert_remote(remote("R2", "gone.png", 5), vec![0; 5]);
        let reconciler = reconciler(&mirror);
        reconciler.pull_remote(&library, false).await.unwrap();
        let local_only = import_text(&library, "local.txt").await;

        mirror.remove_remote("R2");
        let kept = reconciler.pull_remote(&library, false).await.unwrap();
        assert_eq!(kept.removed, 0);
        assert_eq!(library.list().await.unwrap().len(), 2);

        let removed = reconciler.pull_remote(&library, true).await.unwrap();
        assert_eq!(removed, PullOutcome { added: 0, removed: 1 });
        let remaining = library.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].local_id, local_only.local_id);
    }

    #[tokio::test]
    async fn pull_list_failure_is_zero_progress() {
        let library = library();
        let mirror = MockMirror::new();
        mirror.insert_remote(remote("R1", "photo.png", 12), vec![0; 12]);
        mirror.fail_next_list("offline");

        let outcome = reconciler(&mirror).pull_remote(&library, true).await.unwrap();
        assert_eq!(outcome, PullOutcome::default());
        assert!(library.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hydrate_downloads_and_persists_handle() {
        let library = library();
        let mirror = MockMirror::new();
        mirror.insert_remote(remote("R1", "photo.png", 3), vec![5, 6, 7]);
        let reconciler = reconciler(&mirror);
        reconciler.pull_remote(&library, false).await.unwrap();
        let pulled = library.list().await.unwrap().remove(0);

        let hydrated = reconciler.hydrate(&library, &pulled).await.unwrap().unwrap();
        assert!(hydrated.is_downloaded());
        assert_eq!(library.content(&hydrated).await.unwrap(), Some(vec![5, 6, 7]));

        let stored = library.get(pulled.local_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.blob_handle, hydrated.blob_handle);

        // Already downloaded: no further calls.
        let calls = mirror.download_calls();
        reconciler.hydrate(&library, &stored).await.unwrap();
        assert_eq!(mirror.download_calls(), calls);
    }

    #[tokio::test]
    async fn download_failure_is_soft() {
        let library = library();
        let mirror = MockMirror::new();
        mirror.insert_remote(remote("R1", "photo.png", 3), vec![5, 6, 7]);
        let reconciler = reconciler(&mirror);
        reconciler.pull_remote(&library, false).await.unwrap();
        let pulled = library.list().await.unwrap().remove(0);

        mirror.fail_next_download("timeout");
        assert_eq!(reconciler.download_one(&pulled).await.unwrap(), None);

        mirror.fail_next_download("timeout");
        assert_eq!(reconciler.hydrate(&library, &pulled).await.unwrap(), None);
        let stored = library.get(pulled.local_id.unwrap()).await.unwrap().unwrap();
        assert!(!stored.is_downloaded());

        assert!(reconciler.hydrate(&library, &pulled).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn download_falls_back_to_locator() {
        let mirror = MockMirror::new();
        mirror.insert_remote(remote("R1", "photo.png", 3), vec![5, 6, 7]);
        let mut record = AssetRecord::new("photo.png", "image/png", 3, 0);
        record.remote_locator = Some("/files/R1/photo.png".to_string());

        let bytes = reconciler(&mirror).download_one(&record).await.unwrap();
        assert_eq!(bytes, Some(vec![5, 6, 7]));

        record.remote_locator = None;
        assert_eq!(reconciler(&mirror).download_one(&record).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_asset_removes_remote_then_local() {
        let library = library();
        let mirror = MockMirror::new();
        let reconciler = reconciler(&mirror);
        let mut asset = import_text(&library, "a.txt").await;
        reconciler.upload_one(&library, &mut asset).await.unwrap();
        library.update_asset(&asset).await.unwrap();

        reconciler.delete_asset(&library, &asset).await.unwrap();
        assert!(mirror.remote_ids().is_empty());
        assert!(library.list().await.unwrap().is_empty());
        assert!(library.blobs().is_empty());
    }

    #[tokio::test]
    async fn failed_remote_delete_keeps_local_record() {
        let library = library();
        let mirror = MockMirror::new();
        let reconciler = reconciler(&mirror);
        let mut asset = import_text(&library, "a.txt").await;
        reconciler.upload_one(&library, &mut asset).await.unwrap();
        library.update_asset(&asset).await.unwrap();

        mirror.fail_next_delete("forbidden");
        let err = reconciler.delete_asset(&library, &asset).await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteDelete { .. }));
        assert_eq!(library.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_local_only_asset_skips_mirror() {
        let library = library();
        let mirror = MockMirror::new();
        let asset = import_text(&library, "a.txt").await;

        reconciler(&mirror).delete_asset(&library, &asset).await.unwrap();
        assert_eq!(mirror.delete_calls(), 0);
        assert!(library.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blob_read_failure_marks_error_and_is_retried() {
        let local = FlakyLocal::new(library());
        let mirror = MockMirror::new();
        let asset = import_text(&local.inner, "a.txt").await;
        let local_id = asset.local_id.unwrap();
        let reconciler = reconciler(&mirror);

        local.fail_reads.store(true, Ordering::SeqCst);
        let outcome = reconciler.sync_pending(&local).await.unwrap();
        assert_eq!(outcome, SyncOutcome { uploaded: 0, failed: 1 });
        let stored = local.inner.get(local_id).await.unwrap().unwrap();
        assert_eq!(stored.sync_status, Some(SyncStatus::Error));
        assert!(stored.sync_error.unwrap().contains("EIO"));
        assert_eq!(local.pending_assets().await.unwrap().len(), 1);

        local.fail_reads.store(false, Ordering::SeqCst);
        let outcome = reconciler.sync_pending(&local).await.unwrap();
        assert_eq!(outcome, SyncOutcome { uploaded: 1, failed: 0 });
    }

    #[tokio::test]
    async fn interrupted_upload_is_picked_up_again() {
        let library = library();
        let mirror = MockMirror::new();
        let mut asset = import_text(&library, "a.txt").await;
        asset.sync_status = Some(SyncStatus::Syncing);
        library.update_asset(&asset).await.unwrap();

        let outcome = reconciler(&mirror).sync_pending(&library).await.unwrap();
        assert_eq!(outcome.uploaded, 1);
        let stored = library.get(asset.local_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.sync_status, Some(SyncStatus::Synced));
    }

    #[tokio::test]
    async fn sync_pending_with_nothing_pending_still_requires_identity() {
        let library = library();
        let reconciler = SyncReconciler::new(MockMirror::new(), StaticIdentity::anonymous());

        assert!(matches!(
            reconciler.sync_pending(&library).await,
            Err(SyncError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn hydrate_update_failure_deletes_new_blob() {
        let local = FlakyLocal::new(library());
        let mirror = MockMirror::new();
        mirror.insert_remote(remote("R1", "photo.png", 3), vec![5, 6, 7]);
        let reconciler = reconciler(&mirror);
        reconciler.pull_remote(&local, false).await.unwrap();
        let pulled = local.inner.list().await.unwrap().remove(0);

        local.fail_updates.store(true, Ordering::SeqCst);
        let err = reconciler.hydrate(&local, &pulled).await.unwrap_err();
        assert!(matches!(err, SyncError::Local(_)));
        assert!(local.inner.blobs().is_empty());
        assert!(local.inner.orphaned_blobs().await.unwrap().is_empty());

        let stored = local.inner.get(pulled.local_id.unwrap()).await.unwrap().unwrap();
        assert!(!stored.is_downloaded());
    }
}
