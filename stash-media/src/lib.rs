//! # stash-media
//!
//! Best-effort image metadata for imported assets.
//!
//! Given raw bytes, [`extract_dimensions_and_thumbnail`] reads the intrinsic
//! size and synthesizes a downscaled preview. Nothing here returns an error:
//! a file that cannot be decoded simply yields fewer fields in [`ImageInfo`].
//!
//! ## Thumbnail encoding
//!
//! ```text
//! source can carry alpha? ──no──► JPEG (q=85)
//!          │yes
//! any rendered pixel alpha < 255? ──no──► JPEG (q=85)
//!          │yes
//!          ▼
//!        PNG (lossless, alpha kept)
//! ```
//!
//! PNG thumbnails are materially larger, so they are only produced when the
//! image actually has transparency.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod thumbnail;

pub use thumbnail::{
    extract_dimensions_and_thumbnail, has_transparency, scaled_dimensions, source_supports_alpha,
    ImageInfo, ImageProcessor, Thumbnail, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION,
    LOSSLESS_MIME, LOSSY_MIME,
};
