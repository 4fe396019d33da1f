//! # stash-library
//!
//! A local-first media library: files are imported into a [`BlobStore`],
//! described by [`AssetRecord`]s in a [`MetadataStore`], and given
//! dimensions and thumbnails when they are images.
//!
//! ## Usage
//!
//! ```no_run
//! use stash_library::{AssetLibrary, ImportFile, LibraryConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LibraryConfig::default();
//! let library = AssetLibrary::open(std::path::Path::new("./data"), &config)?;
//!
//! let file = ImportFile::from_path(std::path::Path::new("photo.jpg")).await?;
//! let id = library.import(file).await?;
//!
//! for record in library.list().await? {
//!     println!("{} {}", record.display_name, record.kind);
//! }
//! # let _ = id;
//! # Ok(())
//! # }
//! ```
//!
//! [`BlobStore`]: stash_store::BlobStore
//! [`MetadataStore`]: stash_store::MetadataStore
//! [`AssetRecord`]: stash_types::AssetRecord

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod error;
mod importer;
mod library;

pub use config::{ConfigError, LibraryConfig, StorageConfig, SyncConfig, ThumbnailConfig};
pub use error::{LibraryError, Result};
pub use importer::{guess_mime_type, AssetImporter, ImportFile, ImportOptions, FALLBACK_MIME};
pub use library::{AssetLibrary, FsLibrary, Preview};
