//! Remote mirror wire format.

use serde::{Deserialize, Serialize};

/// One asset as described by the remote mirror's JSON API.
///
/// Returned by `POST /assets` and, as an array, by `GET /assets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAsset {
    /// Remote identity.
    pub id: String,
    /// Remote path or URL of the content.
    pub path: String,
    /// ISO-8601 creation timestamp on the remote.
    pub created_at: String,
    /// ISO-8601 update timestamp on the remote.
    pub updated_at: String,
    /// Original filename.
    pub file_name: String,
    /// Asset kind name (`image`, `video`, ...).
    pub file_type: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// Content size in bytes.
    pub size: u64,
    /// Image width, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Image height, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl RemoteAsset {
    /// `(file_name, size)` fingerprint, comparable with
    /// [`AssetRecord::fingerprint`](crate::AssetRecord::fingerprint).
    pub fn fingerprint(&self) -> (&str, u64) {
        (&self.file_name, self.size)
    }
}
