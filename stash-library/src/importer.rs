//! Import pipeline: classify, derive image metadata, persist blobs, insert record.
//!
//! The original bytes are always saved and the record always inserted;
//! image processing is best-effort and its failure only leaves the
//! dimension and thumbnail fields empty.

use std::path::Path;
use std::sync::Arc;

use stash_media::ImageProcessor;
use stash_store::{BlobStore, MetadataStore};
use stash_types::{now_millis, AssetKind, AssetRecord, SyncStatus};

use crate::error::{LibraryError, Result};

/// MIME type used when nothing better is known.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// A file handed to the importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    /// Original filename, used as the display name and handle hint.
    pub name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// File content.
    pub bytes: Vec<u8>,
}

impl ImportFile {
    /// Create an import file from in-memory content.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| LibraryError::ReadFile {
                path: path.to_path_buf(),
                source: e,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        Ok(Self {
            mime_type: guess_mime_type(path).to_string(),
            name,
            bytes,
        })
    }
}

/// Guess a MIME type from a path's extension.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FALLBACK_MIME;
    };
    if let Some(format) = image::ImageFormat::from_extension(ext) {
        return format.to_mime_type();
    }
    match ext.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        _ => FALLBACK_MIME,
    }
}

/// Settings for the import pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Derive dimensions and a thumbnail for images.
    pub thumbnails: bool,
    /// Bound on a thumbnail's larger side in pixels.
    pub max_thumbnail_dimension: u32,
    /// Mark new records `pending` so the next sync pass uploads them.
    pub queue_for_sync: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            thumbnails: true,
            max_thumbnail_dimension: stash_media::DEFAULT_MAX_DIMENSION,
            queue_for_sync: false,
        }
    }
}

impl From<&crate::LibraryConfig> for ImportOptions {
    fn from(config: &crate::LibraryConfig) -> Self {
        Self {
            thumbnails: config.thumbnails.enabled,
            max_thumbnail_dimension: config.thumbnails.max_dimension,
            queue_for_sync: config.sync.enabled,
        }
    }
}

/// Orchestrates the blob store, metadata store and image processor.
#[derive(Debug, Clone, Copy)]
pub struct AssetImporter {
    options: ImportOptions,
}

impl AssetImporter {
    /// Create an importer.
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }

    /// Import settings.
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import one file and return the persisted record.
    ///
    /// Fails only when the original bytes cannot be saved or the record
    /// cannot be inserted. In either case, blobs written by this call are
    /// removed again.
    pub async fn import<B, M>(
        &self,
        blobs: &B,
        metadata: &M,
        file: ImportFile,
    ) -> Result<AssetRecord>
    where
        B: BlobStore + ?Sized,
        M: MetadataStore + ?Sized,
    {
        let ImportFile {
            name,
            mime_type,
            bytes,
        } = file;
        let bytes = Arc::new(bytes);
        let kind = AssetKind::from_mime(&mime_type);

        let mut record = AssetRecord::new(&name, &mime_type, bytes.len() as u64, 0);
        let mut written = Vec::new();

        if kind == AssetKind::Image && self.options.thumbnails {
            let info = self.process_image(Arc::clone(&bytes), &mime_type).await;
            record.width = info.width;
            record.height = info.height;

            if let Some(thumb) = info.thumbnail {
                let hint = format!("thumb.{}", thumbnail_extension(thumb.mime_type));
                match blobs.save(&thumb.bytes, &hint).await {
                    Ok(handle) => {
                        record.thumbnail_handle = Some(handle.clone());
                        record.thumbnail_mime_type = Some(thumb.mime_type.to_string());
                        record.thumbnail_byte_size = Some(thumb.bytes.len() as u64);
                        written.push(handle);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to save thumbnail for {}: {}", name, e);
                    }
                }
            }
        }

        let handle = match blobs.save(&bytes, &name).await {
            Ok(handle) => handle,
            Err(e) => {
                discard(blobs, &written).await;
                return Err(e.into());
            }
        };
        record.blob_handle = handle.clone();
        written.push(handle);

        let now = now_millis();
        record.created_at = now;
        record.updated_at = now;
        if self.options.queue_for_sync {
            record.sync_status = Some(SyncStatus::Pending);
        }

        match metadata.insert(&record).await {
            Ok(local_id) => {
                record.local_id = Some(local_id);
                tracing::info!(
                    "Imported {} as {} ({} bytes, kind {})",
                    name,
                    local_id,
                    record.byte_size,
                    kind
                );
                Ok(record)
            }
            Err(e) => {
                discard(blobs, &written).await;
                Err(e.into())
            }
        }
    }

    /// Run the image processor off the async runtime.
    ///
    /// A panic inside the decoder degrades to "no metadata".
    async fn process_image(&self, bytes: Arc<Vec<u8>>, mime_type: &str) -> stash_media::ImageInfo {
        let processor = ImageProcessor::new(self.options.max_thumbnail_dimension);
        let mime = mime_type.to_string();
        match tokio::task::spawn_blocking(move || processor.process(&bytes, &mime)).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Image processing aborted: {}", e);
                stash_media::ImageInfo::default()
            }
        }
    }
}

impl Default for AssetImporter {
    fn default() -> Self {
        Self::new(ImportOptions::default())
    }
}

fn thumbnail_extension(mime_type: &str) -> &'static str {
    if mime_type == stash_media::LOSSLESS_MIME {
        "png"
    } else {
        "jpg"
    }
}

/// Best-effort removal of blobs written by a failed import.
async fn discard<B: BlobStore + ?Sized>(blobs: &B, handles: &[String]) {
    for handle in handles {
        if let Err(e) = blobs.delete(handle).await {
            tracing::warn!("Failed to remove blob {} after failed import: {}", handle, e);
        }
    }
}
