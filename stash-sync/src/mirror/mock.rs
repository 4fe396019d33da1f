//! In-memory mirror for testing.
//!
//! Stores uploaded assets, counts calls and can be told to fail.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stash_types::RemoteAsset;

use super::{RemoteMirror, UploadRequest};
use crate::error::MirrorError;

/// Mock mirror for testing.
///
/// Clones share the same remote state.
#[derive(Debug, Default, Clone)]
pub struct MockMirror {
    inner: Arc<Mutex<MockMirrorInner>>,
}

#[derive(Debug, Default)]
struct MockMirrorInner {
    assets: Vec<(RemoteAsset, Vec<u8>)>,
    next_id: u64,
    list_calls: usize,
    upload_calls: usize,
    download_calls: usize,
    delete_calls: usize,
    last_identity: Option<String>,
    fail_next_list: Option<String>,
    fail_next_upload: Option<String>,
    fail_next_download: Option<String>,
    fail_next_delete: Option<String>,
}

impl MockMirrorInner {
    fn position(&self, remote_id: &str) -> Option<usize> {
        self.assets.iter().position(|(a, _)| a.id == remote_id)
    }
}

impl MockMirror {
    /// Create an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an asset on the remote as if another device had uploaded it.
    pub fn insert_remote(&self, asset: RemoteAsset, bytes: Vec<u8>) {
        let mut inner = self.inner.lock().unwrap();
        inner.assets.push((asset, bytes));
    }

    /// Delete an asset on the remote behind the client's back.
    pub fn remove_remote(&self, remote_id: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.position(remote_id) {
            Some(index) => {
                inner.assets.remove(index);
                true
            }
            None => false,
        }
    }

    /// Ids of every remote asset, in upload order.
    pub fn remote_ids(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.assets.iter().map(|(a, _)| a.id.clone()).collect()
    }

    /// Bytes stored for a remote asset.
    pub fn remote_bytes(&self, remote_id: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.position(remote_id).map(|i| inner.assets[i].1.clone())
    }

    /// Number of `list()` calls.
    pub fn list_calls(&self) -> usize {
        self.inner.lock().unwrap().list_calls
    }

    /// Number of `upload()` calls.
    pub fn upload_calls(&self) -> usize {
        self.inner.lock().unwrap().upload_calls
    }

    /// Number of `download()` and `download_locator()` calls.
    pub fn download_calls(&self) -> usize {
        self.inner.lock().unwrap().download_calls
    }

    /// Number of `delete()` calls.
    pub fn delete_calls(&self) -> usize {
        self.inner.lock().unwrap().delete_calls
    }

    /// Total number of calls of any kind.
    pub fn total_calls(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.list_calls + inner.upload_calls + inner.download_calls + inner.delete_calls
    }

    /// Identity passed to the most recent call.
    pub fn last_identity(&self) -> Option<String> {
        self.inner.lock().unwrap().last_identity.clone()
    }

    /// Cause the next `list()` to fail with the given message.
    pub fn fail_next_list(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_list = Some(error.to_string());
    }

    /// Cause the next `upload()` to fail with the given message.
    pub fn fail_next_upload(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_upload = Some(error.to_string());
    }

    /// Cause the next download to fail with the given message.
    pub fn fail_next_download(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_download = Some(error.to_string());
    }

    /// Cause the next `delete()` to fail with the given message.
    pub fn fail_next_delete(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_delete = Some(error.to_string());
    }
}

#[async_trait]
impl RemoteMirror for MockMirror {
    async fn list(&self, identity: &str) -> Result<Vec<RemoteAsset>, MirrorError> {
        let mut inner = self.inner.lock().unwrap();
        inner.list_calls += 1;
        inner.last_identity = Some(identity.to_string());

        if let Some(error) = inner.fail_next_list.take() {
            return Err(MirrorError::Rejected(error));
        }

        Ok(inner.assets.iter().map(|(a, _)| a.clone()).collect())
    }

    async fn upload(
        &self,
        identity: &str,
        request: UploadRequest,
    ) -> Result<RemoteAsset, MirrorError> {
        let mut inner = self.inner.lock().unwrap();
        inner.upload_calls += 1;
        inner.last_identity = Some(identity.to_string());

        if let Some(error) = inner.fail_next_upload.take() {
            return Err(MirrorError::Rejected(error));
        }

        inner.next_id += 1;
        let id = format!("remote-{}", inner.next_id);
        let asset = RemoteAsset {
            path: format!("/files/{}/{}", id, request.file_name),
            id,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            file_name: request.file_name,
            file_type: request.file_type,
            mime_type: request.mime_type,
            size: request.bytes.len() as u64,
            width: request.width,
            height: request.height,
        };
        inner.assets.push((asset.clone(), request.bytes));
        Ok(asset)
    }

    async fn download(&self, identity: &str, remote_id: &str) -> Result<Vec<u8>, MirrorError> {
        let mut inner = self.inner.lock().unwrap();
        inner.download_calls += 1;
        inner.last_identity = Some(identity.to_string());

        if let Some(error) = inner.fail_next_download.take() {
            return Err(MirrorError::Rejected(error));
        }

        inner
            .position(remote_id)
            .map(|i| inner.assets[i].1.clone())
            .ok_or_else(|| MirrorError::NotFound(remote_id.to_string()))
    }

    async fn download_locator(
        &self,
        identity: &str,
        locator: &str,
    ) -> Result<Vec<u8>, MirrorError> {
        let mut inner = self.inner.lock().unwrap();
        inner.download_calls += 1;
        inner.last_identity = Some(identity.to_string());

        if let Some(error) = inner.fail_next_download.take() {
            return Err(MirrorError::Rejected(error));
        }

        inner
            .assets
            .iter()
            .find(|(a, _)| a.path == locator)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| MirrorError::NotFound(locator.to_string()))
    }

    async fn delete(&self, identity: &str, remote_id: &str) -> Result<(), MirrorError> {
        let mut inner = self.inner.lock().unwrap();
        inner.delete_calls += 1;
        inner.last_identity = Some(identity.to_string());

        if let Some(error) = inner.fail_next_delete.take() {
            return Err(MirrorError::Rejected(error));
        }

        match inner.position(remote_id) {
            Some(index) => {
                inner.assets.remove(index);
                Ok(())
            }
            None => Err(MirrorError::NotFound(remote_id.to_string())),
        }
    }
}
