//! Handle-addressed blob storage.
//!
//! This module provides a trait for storing original files and thumbnails
//! in a single flat directory, a filesystem implementation, and a
//! memory-based implementation for testing.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;
use crate::handle::{generate_handle, is_valid_handle};

/// Default name of the blob directory.
pub const DEFAULT_DIRECTORY: &str = "media-library";

/// Attempts before giving up on allocating an unused handle.
const MAX_HANDLE_ATTEMPTS: u32 = 8;

/// Trait for handle-addressed blob storage.
///
/// Originals and thumbnails share one namespace; they are told apart only by
/// the name hint baked into the handle.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under a freshly generated handle and return it.
    ///
    /// The handle is derived from `name_hint` (usually the original filename)
    /// and is never equal to a handle already in the store.
    async fn save(&self, bytes: &[u8], name_hint: &str) -> Result<String, StoreError>;

    /// Read the content stored under `handle`.
    ///
    /// Returns `Ok(None)` if nothing is stored there. Callers must treat that
    /// as a degraded state, not a failure.
    async fn read(&self, handle: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete the content stored under `handle`.
    ///
    /// Deleting a missing handle succeeds.
    async fn delete(&self, handle: &str) -> Result<(), StoreError>;

    /// List every handle currently stored.
    async fn list_handles(&self) -> Result<Vec<String>, StoreError>;
}

/// Blob store backed by a directory on the local filesystem.
///
/// The directory is `{root}/{directory}` and is created on demand by every
/// operation rather than cached, so a directory removed underneath the store
/// is simply recreated.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    directory: String,
}

impl FsBlobStore {
    /// Create a store using [`DEFAULT_DIRECTORY`] under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_directory(root, DEFAULT_DIRECTORY)
    }

    /// Create a store using a custom directory name under `root`.
    pub fn with_directory(root: impl Into<PathBuf>, directory: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            directory: directory.into(),
        }
    }

    /// Full path of the blob directory.
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.directory)
    }

    async fn dir(&self) -> Result<PathBuf, StoreError> {
        let dir = self.path();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    async fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(path).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(&self, bytes: &[u8], name_hint: &str) -> Result<String, StoreError> {
        let dir = self.dir().await?;

        for _ in 0..MAX_HANDLE_ATTEMPTS {
            let handle = generate_handle(name_hint, stash_types::now_millis());
            match Self::write_new(&dir.join(&handle), bytes).await {
                Ok(()) => {
                    tracing::debug!("Saved blob {} ({} bytes)", handle, bytes.len());
                    return Ok(handle);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!("Handle collision on {}, regenerating", handle);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::HandleExhausted {
            name_hint: name_hint.to_string(),
            attempts: MAX_HANDLE_ATTEMPTS,
        })
    }

    async fn read(&self, handle: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if !is_valid_handle(handle) {
            return Ok(None);
        }
        let dir = self.dir().await?;
        match tokio::fs::read(dir.join(handle)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, handle: &str) -> Result<(), StoreError> {
        if !is_valid_handle(handle) {
            return Ok(());
        }
        let dir = self.dir().await?;
        match tokio::fs::remove_file(dir.join(handle)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_handles(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.dir().await?;
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut handles = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                handles.push(name.to_string());
            }
        }

        handles.sort();
        Ok(handles)
    }
}

/// In-memory blob store for testing.
///
/// Stores blobs in a thread-safe HashMap. Clones share the same contents.
#[derive(Debug, Default, Clone)]
pub struct MemoryBlobStore {
    inner: Arc<Mutex<MemoryBlobInner>>,
}

#[derive(Debug, Default)]
struct MemoryBlobInner {
    blobs: HashMap<String, Vec<u8>>,
    fail_next_save: Option<String>,
}

impl MemoryBlobStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().blobs.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().blobs.is_empty()
    }

    /// Check if a handle is present.
    pub fn contains(&self, handle: &str) -> bool {
        self.inner.lock().unwrap().blobs.contains_key(handle)
    }

    /// Remove a blob without going through the trait (simulates eviction).
    pub fn evict(&self, handle: &str) -> bool {
        self.inner.lock().unwrap().blobs.remove(handle).is_some()
    }

    /// Cause the next `save()` to fail with the given message.
    pub fn fail_next_save(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_save = Some(error.to_string());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(&self, bytes: &[u8], name_hint: &str) -> Result<String, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_save.take() {
            return Err(StoreError::Backend(error));
        }

        for _ in 0..MAX_HANDLE_ATTEMPTS {
            let handle = generate_handle(name_hint, stash_types::now_millis());
            if let std::collections::hash_map::Entry::Vacant(slot) =
                inner.blobs.entry(handle.clone())
            {
                slot.insert(bytes.to_vec());
                return Ok(handle);
            }
        }

        Err(StoreError::HandleExhausted {
            name_hint: name_hint.to_string(),
            attempts: MAX_HANDLE_ATTEMPTS,
        })
    }

    async fn read(&self, handle: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.inner.lock().unwrap().blobs.get(handle).cloned())
    }

    async fn delete(&self, handle: &str) -> Result<(), StoreError> {
        self.inner.lock().unwrap().blobs.remove(handle);
        Ok(())
    }

    async fn list_handles(&self) -> Result<Vec<String>, StoreError> {
        let mut handles: Vec<String> = self.inner.lock().unwrap().blobs.keys().cloned().collect();
        handles.sort();
        Ok(handles)
    }
}
