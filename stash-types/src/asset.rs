//! The asset record and its closed classifications.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{LocalId, TypeError};

/// Media classification of an asset.
///
/// Always derived from the MIME type, never set by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// `image/*`
    Image,
    /// `video/*`
    Video,
    /// `audio/*`
    Audio,
    /// `text/*` or anything mentioning pdf
    Document,
    /// Everything else
    Other,
}

impl AssetKind {
    /// Classify a MIME type.
    pub fn from_mime(mime_type: &str) -> Self {
        let mime = mime_type.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else if mime.starts_with("audio/") {
            Self::Audio
        } else if mime.starts_with("text/") || mime.contains("pdf") {
            Self::Document
        } else {
            Self::Other
        }
    }

    /// Stable lowercase name (matches the remote `fileType` field).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "document" => Ok(Self::Document),
            "other" => Ok(Self::Other),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

/// Per-asset synchronization state.
///
/// ```text
/// pending → syncing → synced
///              ↓  ↑
///             error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Waiting for the next upload pass.
    Pending,
    /// Upload in flight.
    Syncing,
    /// Present on the remote mirror.
    Synced,
    /// Last upload failed; retried on the next pass.
    Error,
}

impl SyncStatus {
    /// Stable lowercase name used in persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }

    /// Whether an asset in this state is a candidate for upload.
    pub fn wants_upload(&self) -> bool {
        matches!(self, Self::Pending | Self::Error)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "syncing" => Ok(Self::Syncing),
            "synced" => Ok(Self::Synced),
            "error" => Ok(Self::Error),
            other => Err(TypeError::UnknownSyncStatus(other.to_string())),
        }
    }
}

/// One imported file plus its sync state.
///
/// An empty `blob_handle` means the record was pulled from the remote mirror
/// and its content has not been downloaded yet; such a record is not viewable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// Assigned once by the metadata store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<LocalId>,
    /// Identity on the remote mirror, once synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Owning identity, once synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Key into the blob store (empty = not yet downloaded).
    pub blob_handle: String,
    /// Remote path or URL, once synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_locator: Option<String>,
    /// Key of the thumbnail blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_handle: Option<String>,
    /// MIME type of the thumbnail blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_mime_type: Option<String>,
    /// Size of the thumbnail blob in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_byte_size: Option<u64>,
    /// Original filename, unsanitized.
    pub display_name: String,
    /// Derived from `mime_type`.
    pub kind: AssetKind,
    /// Source of truth for `kind`.
    pub mime_type: String,
    /// Size of the original content in bytes.
    pub byte_size: u64,
    /// Intrinsic width for images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Intrinsic height for images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Epoch milliseconds; immutable after creation.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
    /// Epoch milliseconds of the last successful upload or pull.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<i64>,
    /// The remote record's own ISO-8601 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_created_at: Option<String>,
    /// `None` means not yet considered for sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<SyncStatus>,
    /// Set only while `sync_status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_error: Option<String>,
}

impl AssetRecord {
    /// Build a fresh, unpersisted record with `created_at = updated_at = now`.
    pub fn new(
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
        byte_size: u64,
        now: i64,
    ) -> Self {
        let mime_type = mime_type.into();
        Self {
            local_id: None,
            remote_id: None,
            owner_id: None,
            blob_handle: String::new(),
            remote_locator: None,
            thumbnail_handle: None,
            thumbnail_mime_type: None,
            thumbnail_byte_size: None,
            display_name: display_name.into(),
            kind: AssetKind::from_mime(&mime_type),
            mime_type,
            byte_size,
            width: None,
            height: None,
            created_at: now,
            updated_at: now,
            synced_at: None,
            remote_created_at: None,
            sync_status: None,
            sync_error: None,
        }
    }

    /// Whether the content is available locally.
    pub fn is_downloaded(&self) -> bool {
        !self.blob_handle.is_empty()
    }

    /// Whether the record is a candidate for the next upload pass.
    pub fn wants_upload(&self) -> bool {
        self.sync_status.is_some_and(|s| s.wants_upload())
    }

    /// `(display_name, byte_size)` used for heuristic pull dedup.
    ///
    /// Two different files may share a fingerprint and the same content
    /// re-encoded will not; this is an approximation, not an identity.
    pub fn fingerprint(&self) -> (&str, u64) {
        (&self.display_name, self.byte_size)
    }

    /// Every blob handle this record owns (original then thumbnail).
    pub fn blob_handles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.blob_handle.as_str())
            .chain(self.thumbnail_handle.as_deref())
            .filter(|h| !h.is_empty())
    }
}
