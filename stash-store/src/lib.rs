//! # stash-store
//!
//! The two independently durable halves of the local asset library:
//!
//! - [`BlobStore`]: a flat directory of binary content (originals and
//!   thumbnails), addressed by generated handle names.
//! - [`MetadataStore`]: an indexed database of [`AssetRecord`]s keyed by an
//!   auto-assigned [`LocalId`], ordered by creation time.
//!
//! The halves can diverge after partial failures (storage eviction, a crash
//! between the blob write and the record insert). Reads of a missing blob
//! therefore return `Ok(None)` rather than an error, and callers treat absence
//! as a degraded state.
//!
//! [`AssetRecord`]: stash_types::AssetRecord
//! [`LocalId`]: stash_types::LocalId

#![warn(missing_docs)]
#![warn(clippy::all)]

mod blob;
mod error;
mod handle;
mod metadata;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore, DEFAULT_DIRECTORY};
pub use error::StoreError;
pub use handle::{generate_handle, sanitize_name_hint};
pub use metadata::{MetadataStore, SqliteMetadataStore, SCHEMA_VERSION};
