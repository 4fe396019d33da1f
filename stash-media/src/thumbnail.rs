use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageReader, ImageResult};
use std::io::Cursor;

/// Default bound on the larger side of a thumbnail.
pub const DEFAULT_MAX_DIMENSION: u32 = 256;

/// JPEG quality for opaque thumbnails (out of 100).
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// MIME type of thumbnails without alpha.
pub const LOSSY_MIME: &str = "image/jpeg";

/// MIME type of thumbnails that keep transparency.
pub const LOSSLESS_MIME: &str = "image/png";

/// Source formats able to carry an alpha channel.
const ALPHA_CAPABLE: &[&str] = &[
    "image/png",
    "image/apng",
    "image/webp",
    "image/gif",
    "image/avif",
    "image/tiff",
    "image/x-icon",
    "image/vnd.microsoft.icon",
    "image/qoi",
];

/// A synthesized preview image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// [`LOSSY_MIME`] or [`LOSSLESS_MIME`].
    pub mime_type: &'static str,
    /// Thumbnail width in pixels.
    pub width: u32,
    /// Thumbnail height in pixels.
    pub height: u32,
}

/// Whatever could be learned about an image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageInfo {
    /// Intrinsic width, if readable.
    pub width: Option<u32>,
    /// Intrinsic height, if readable.
    pub height: Option<u32>,
    /// Downscaled preview, if decoding and encoding succeeded.
    pub thumbnail: Option<Thumbnail>,
}

/// Thumbnail settings bundled for reuse across imports.
#[derive(Debug, Clone, Copy)]
pub struct ImageProcessor {
    max_dimension: u32,
    jpeg_quality: u8,
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImageProcessor {
    /// Create a processor bounding thumbnails to `max_dimension`.
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension,
            ..Self::default()
        }
    }

    /// Override the JPEG quality (clamped to 1..=100).
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Bound on the larger side of a thumbnail.
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Extract dimensions and synthesize a thumbnail.
    pub fn process(&self, bytes: &[u8], source_mime: &str) -> ImageInfo {
        extract(bytes, source_mime, self.max_dimension, self.jpeg_quality)
    }
}

/// Extract intrinsic dimensions and a thumbnail no larger than `max_dimension`.
///
/// Never fails. Undecodable input yields the header dimensions if those
/// could be read, and no thumbnail.
pub fn extract_dimensions_and_thumbnail(
    bytes: &[u8],
    source_mime: &str,
    max_dimension: u32,
) -> ImageInfo {
    extract(bytes, source_mime, max_dimension, DEFAULT_JPEG_QUALITY)
}

fn extract(bytes: &[u8], source_mime: &str, max_dimension: u32, quality: u8) -> ImageInfo {
    let image = match decode(bytes) {
        Ok(image) => image,
        Err(e) => {
            let dims = read_dimensions(bytes);
            tracing::warn!(
                "Could not decode {} image ({} bytes): {}; header dimensions: {:?}",
                source_mime,
                bytes.len(),
                e,
                dims
            );
            return ImageInfo {
                width: dims.map(|(w, _)| w),
                height: dims.map(|(_, h)| h),
                thumbnail: None,
            };
        }
    };

    let (width, height) = (image.width(), image.height());
    let (thumb_width, thumb_height) = scaled_dimensions(width, height, max_dimension);

    let rendered = if (thumb_width, thumb_height) == (width, height) {
        image
    } else {
        image.resize_exact(thumb_width, thumb_height, FilterType::Triangle)
    };

    let thumbnail = match encode(&rendered, source_mime, quality) {
        Ok(thumbnail) => Some(thumbnail),
        Err(e) => {
            tracing::warn!("Could not encode thumbnail: {}", e);
            None
        }
    };

    ImageInfo {
        width: Some(width),
        height: Some(height),
        thumbnail,
    }
}

fn decode(bytes: &[u8]) -> ImageResult<DynamicImage> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
}

/// Header-only size read, used when a full decode fails.
fn read_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Thumbnail size for a `width × height` image bounded by `max_dimension`.
///
/// Scale is `min(1, max / max(width, height))`; each side is rounded and
/// floored at 1. Images already within bounds are never upscaled.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let largest = width.max(height).max(1);
    let scale = (f64::from(max_dimension.max(1)) / f64::from(largest)).min(1.0);
    let scale_side = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    (scale_side(width), scale_side(height))
}

/// Whether images of this MIME type can carry an alpha channel.
pub fn source_supports_alpha(mime_type: &str) -> bool {
    let mime = mime_type.trim().to_ascii_lowercase();
    ALPHA_CAPABLE.contains(&mime.as_str())
}

/// Whether any pixel of `image` is less than fully opaque.
pub fn has_transparency(image: &DynamicImage) -> bool {
    if !image.color().has_alpha() {
        return false;
    }
    image.to_rgba8().pixels().any(|p| p.0[3] < u8::MAX)
}

fn encode(rendered: &DynamicImage, source_mime: &str, quality: u8) -> ImageResult<Thumbnail> {
    let (width, height) = (rendered.width(), rendered.height());
    let mut bytes = Vec::new();

    let mime_type = if source_supports_alpha(source_mime) && has_transparency(rendered) {
        let rgba = rendered.to_rgba8();
        PngEncoder::new(&mut bytes).write_image(
            rgba.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        )?;
        LOSSLESS_MIME
    } else {
        let rgb = rendered.to_rgb8();
        JpegEncoder::new_with_quality(&mut bytes, quality).write_image(
            rgb.as_raw(),
            width,
            height,
            ExtendedColorType::Rgb8,
        )?;
        LOSSY_MIME
    };

    Ok(Thumbnail {
        bytes,
        mime_type,
        width,
        height,
    })
}
