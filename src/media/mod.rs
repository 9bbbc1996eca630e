//! Encoded image payloads
//!
//! Everything the pipeline moves around is an [`EncodedImage`]: the capture
//! strategies produce one, the normalizer may supersede it with a smaller
//! one, and the extraction client uploads it.

mod normalize;

pub use normalize::{NormalizeLimits, normalize, rescale_jpeg};

use std::io::Cursor;

use image::ImageFormat;

use crate::{Error, Result};

/// An encoded still image: opaque bytes plus MIME tag and pixel dimensions.
///
/// Immutable once constructed. Construction validates the payload, so any
/// `EncodedImage` in the pipeline is non-empty, correctly tagged, and has a
/// readable header.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    mime: &'static str,
    width: u32,
    height: u32,
}

impl EncodedImage {
    /// Validate raw bytes into an `EncodedImage`.
    ///
    /// Sniffs the format from magic bytes and reads dimensions from the
    /// header without a full pixel decode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the payload is empty, not a
    /// supported image format, or its header cannot be read.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Validation("empty image payload".to_string()));
        }

        let format = image::guess_format(&bytes)
            .map_err(|_| Error::Validation("unrecognized image format".to_string()))?;
        let mime = mime_for(format)?;

        let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| Error::Validation(format!("unreadable image header: {e}")))?
            .into_dimensions()
            .map_err(|e| Error::Validation(format!("unreadable image dimensions: {e}")))?;

        Ok(Self {
            bytes,
            mime,
            width,
            height,
        })
    }

    /// The encoded payload
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type tag (e.g. `image/jpeg`)
    #[must_use]
    pub const fn mime(&self) -> &'static str {
        self.mime
    }

    /// Pixel width
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Encoded payload size in bytes
    #[must_use]
    pub const fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Start a full pixel decode on the blocking pool.
///
/// Header validation happens at construction; this confirms the payload
/// actually rasterizes, which some sources only reveal on a complete decode.
/// The returned handle is the explicit completion signal the session polls.
#[must_use]
pub fn begin_decode(img: &EncodedImage) -> tokio::task::JoinHandle<Result<()>> {
    let bytes = img.bytes().to_vec();
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes)
            .map(|_| ())
            .map_err(|e| Error::Validation(format!("image failed to decode: {e}")))
    })
}

/// Map a sniffed format to its MIME tag, rejecting non-image formats
fn mime_for(format: ImageFormat) -> Result<&'static str> {
    match format {
        ImageFormat::Jpeg => Ok("image/jpeg"),
        ImageFormat::Png => Ok("image/png"),
        ImageFormat::Gif => Ok("image/gif"),
        ImageFormat::WebP => Ok("image/webp"),
        other => Err(Error::Validation(format!(
            "unsupported image format: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 80, 40]));
        let mut cursor = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_from_bytes_reads_dimensions() {
        let img = EncodedImage::from_bytes(solid_png(320, 200)).unwrap();
        assert_eq!(img.mime(), "image/png");
        assert_eq!(img.width(), 320);
        assert_eq!(img.height(), 200);
    }

    #[test]
    fn test_empty_payload_rejected() {
        let err = EncodedImage::from_bytes(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_garbage_payload_rejected() {
        let err = EncodedImage::from_bytes(vec![0u8; 64]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_non_image_format_rejected() {
        // A valid BMP header sniffs as an image, but isn't an accepted type
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 0]));
        let mut cursor = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageFormat::Bmp)
            .unwrap();

        let err = EncodedImage::from_bytes(cursor.into_inner()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_begin_decode_completes_for_valid_image() {
        let img = EncodedImage::from_bytes(solid_png(16, 16)).unwrap();
        let handle = begin_decode(&img);
        handle.await.unwrap().unwrap();
    }
}
