//! Remote mirror abstraction.
//!
//! The mirror is the authoritative remote copy of a user's assets:
//! - `list()` returns the full remote set for an identity
//! - `upload()` stores one file and returns its remote description
//! - `download()` / `download_locator()` fetch raw bytes
//! - `delete()` removes one remote asset
//!
//! Every call takes the identity resolved by the caller; the mirror
//! itself holds no credentials.

mod http;
mod mock;

pub use http::HttpMirror;
pub use mock::MockMirror;

use async_trait::async_trait;
use stash_types::{AssetRecord, RemoteAsset};

use crate::error::MirrorError;

/// One file to upload, with the form fields the mirror expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Original filename.
    pub file_name: String,
    /// Asset kind name.
    pub file_type: String,
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// Image width, if known.
    pub width: Option<u32>,
    /// Image height, if known.
    pub height: Option<u32>,
    /// File content.
    pub bytes: Vec<u8>,
}

impl UploadRequest {
    /// Describe `record` with its content `bytes`.
    pub fn for_record(record: &AssetRecord, bytes: Vec<u8>) -> Self {
        Self {
            file_name: record.display_name.clone(),
            file_type: record.kind.as_str().to_string(),
            mime_type: record.mime_type.clone(),
            width: record.width,
            height: record.height,
            bytes,
        }
    }
}

/// Trait for remote mirror backends.
#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// Every remote asset visible to `identity`.
    async fn list(&self, identity: &str) -> Result<Vec<RemoteAsset>, MirrorError>;

    /// Upload one file.
    async fn upload(
        &self,
        identity: &str,
        request: UploadRequest,
    ) -> Result<RemoteAsset, MirrorError>;

    /// Raw bytes of the asset with remote id `remote_id`.
    async fn download(&self, identity: &str, remote_id: &str) -> Result<Vec<u8>, MirrorError>;

    /// Raw bytes at a remote path or URL.
    async fn download_locator(&self, identity: &str, locator: &str)
        -> Result<Vec<u8>, MirrorError>;

    /// Delete the asset with remote id `remote_id`.
    async fn delete(&self, identity: &str, remote_id: &str) -> Result<(), MirrorError>;
}
