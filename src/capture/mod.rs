//! Image acquisition strategies
//!
//! Two ways to obtain a page image: a webcam frame grab or a file chooser.
//! Both normalize into the same [`EncodedImage`](crate::media::EncodedImage)
//! representation, so everything downstream is strategy-agnostic.

mod camera;
mod file;

use async_trait::async_trait;

pub use camera::CameraSource;
pub use file::FileSource;

use crate::Result;
use crate::media::EncodedImage;

/// A source of encoded page images
#[async_trait]
pub trait CaptureSource: Send {
    /// Obtain one encoded image
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capture`](crate::Error::Capture) if acquisition
    /// fails, or [`Error::Validation`](crate::Error::Validation) if the
    /// obtained payload is malformed.
    async fn acquire(&mut self) -> Result<EncodedImage>;

    /// Clear any held selection state so the next acquisition starts fresh.
    ///
    /// Called on every session reset; sources without selection state ignore
    /// it.
    fn rearm(&mut self) {}

    /// Short strategy name for logs
    fn name(&self) -> &'static str;
}
