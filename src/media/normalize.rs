//! Payload size normalization
//!
//! Upload latency dominates the extraction round-trip, and payload size
//! dominates upload latency. Anything over the threshold gets rescaled and
//! recompressed before it goes on the wire; anything under passes through
//! untouched.

use std::io::Cursor;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;

use super::EncodedImage;
use crate::{Error, Result};

/// Recompression limits for oversized payloads
#[derive(Debug, Clone)]
pub struct NormalizeLimits {
    /// Payloads at or below this size pass through unchanged
    pub threshold_bytes: usize,

    /// Maximum width after rescale
    pub max_width: u32,

    /// Maximum height after rescale
    pub max_height: u32,

    /// JPEG re-encode quality (0-100)
    pub jpeg_quality: u8,
}

impl Default for NormalizeLimits {
    fn default() -> Self {
        Self {
            threshold_bytes: 2 * 1024 * 1024,
            max_width: 1400,
            max_height: 1400,
            jpeg_quality: 60,
        }
    }
}

/// Shrink an oversized image, or pass a small one through unchanged.
///
/// CPU-bound; callers run this on the blocking pool.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the payload cannot be decoded or
/// re-encoded.
pub fn normalize(img: EncodedImage, limits: &NormalizeLimits) -> Result<EncodedImage> {
    if img.size_bytes() <= limits.threshold_bytes {
        tracing::debug!(bytes = img.size_bytes(), "image within size threshold");
        return Ok(img);
    }

    let before = img.size_bytes();
    let out = rescale_jpeg(
        img.bytes(),
        limits.max_width,
        limits.max_height,
        limits.jpeg_quality,
    )?;

    tracing::debug!(
        before_bytes = before,
        after_bytes = out.size_bytes(),
        width = out.width(),
        height = out.height(),
        "image recompressed"
    );

    Ok(out)
}

/// Decode, scale to fit within the given bounds (aspect preserved), and
/// re-encode as JPEG at the given quality.
///
/// # Errors
///
/// Returns [`Error::Validation`] if decoding or encoding fails.
pub fn rescale_jpeg(
    bytes: &[u8],
    max_width: u32,
    max_height: u32,
    quality: u8,
) -> Result<EncodedImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| Error::Validation(format!("image failed to decode: {e}")))?;

    let scaled = if decoded.width() > max_width || decoded.height() > max_height {
        decoded.thumbnail(max_width, max_height)
    } else {
        decoded
    };

    // JPEG carries no alpha channel
    let rgb = DynamicImage::ImageRgb8(scaled.to_rgb8());

    let mut cursor = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| Error::Validation(format!("jpeg encode failed: {e}")))?;

    EncodedImage::from_bytes(cursor.into_inner())
}
