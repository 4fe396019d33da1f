//! # stash-sync
//!
//! Reconciles a local [`AssetLibrary`](stash_library::AssetLibrary) against a
//! remote mirror:
//!
//! - **Upload**: `pending` and `error` assets, and any left `syncing` by an
//!   interrupted pass, are uploaded one at a time
//!   ([`SyncReconciler::sync_pending`]).
//! - **Pull**: remote assets missing locally become `synced` records whose
//!   content is downloaded on first view ([`SyncReconciler::pull_remote`],
//!   [`SyncReconciler::hydrate`]).
//! - **Deletion**: explicit deletes go to the mirror first
//!   ([`SyncReconciler::delete_asset`]); remote deletions are propagated to
//!   previously synced local records on request.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use stash_library::{AssetLibrary, LibraryConfig};
//! use stash_sync::{AutoSync, HttpMirror, StaticIdentity, SyncReconciler};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LibraryConfig::default();
//! let library = Arc::new(AssetLibrary::open(std::path::Path::new("./data"), &config)?);
//! let reconciler = Arc::new(SyncReconciler::new(
//!     HttpMirror::new("https://media.example.com/api"),
//!     StaticIdentity::new("token"),
//! ));
//!
//! reconciler.pull_remote(library.as_ref(), true).await?;
//! reconciler.sync_pending(library.as_ref()).await?;
//!
//! let mut auto = AutoSync::new();
//! auto.start(reconciler, library, std::time::Duration::from_secs(60));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod auto;
mod error;
mod identity;
mod local;
pub mod mirror;
mod reconciler;

pub use auto::AutoSync;
pub use error::{MirrorError, Result, SyncError};
pub use identity::{IdentityProvider, StaticIdentity};
pub use local::LocalAssets;
pub use mirror::{HttpMirror, MockMirror, RemoteMirror, UploadRequest};
pub use reconciler::{PullOutcome, SyncOutcome, SyncReconciler};
