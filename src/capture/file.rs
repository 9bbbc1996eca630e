//! Image file chooser
//!
//! Models a re-armable file selector: a selection can be queued by the
//! driving surface (the selection event) or prompted for interactively.
//! After a session reset the selection state is cleared, so choosing the
//! same file again still raises a fresh selection.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::CaptureSource;
use crate::media::EncodedImage;
use crate::{Error, Result};

/// Extensions the chooser accepts
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Obtains page images from chosen files
pub struct FileSource {
    selection: Option<PathBuf>,
    interactive: bool,
}

impl FileSource {
    /// Create a file source. Interactive sources prompt for a path when no
    /// selection is queued; non-interactive ones require [`Self::select`].
    #[must_use]
    pub const fn new(interactive: bool) -> Self {
        Self {
            selection: None,
            interactive,
        }
    }

    /// Queue a chosen file (the selection event)
    pub fn select(&mut self, path: PathBuf) {
        tracing::debug!(path = %path.display(), "file selected");
        self.selection = Some(path);
    }

    /// Whether a selection is queued and not yet consumed
    #[must_use]
    pub const fn has_selection(&self) -> bool {
        self.selection.is_some()
    }
}

#[async_trait]
impl CaptureSource for FileSource {
    async fn acquire(&mut self) -> Result<EncodedImage> {
        let path = match self.selection.take() {
            Some(path) => path,
            None if self.interactive => prompt_for_path().await?,
            None => return Err(Error::Capture("no file selected".to_string())),
        };

        if !has_image_extension(&path) {
            return Err(Error::Capture(format!(
                "not an image file: {}",
                path.display()
            )));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Capture(format!("could not read {}: {e}", path.display())))?;

        let img = EncodedImage::from_bytes(bytes)?;
        tracing::debug!(
            path = %path.display(),
            bytes = img.size_bytes(),
            mime = img.mime(),
            "file read"
        );

        Ok(img)
    }

    fn rearm(&mut self) {
        if self.selection.take().is_some() {
            tracing::debug!("file selection cleared");
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// The chooser is restricted to images
fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Prompt for an image path on the terminal
async fn prompt_for_path() -> Result<PathBuf> {
    tokio::task::spawn_blocking(|| {
        dialoguer::Input::<String>::new()
            .with_prompt("Image file")
            .interact_text()
            .map(PathBuf::from)
            .map_err(|e| Error::Capture(format!("file chooser failed: {e}")))
    })
    .await
    .map_err(|e| Error::Capture(format!("file chooser task failed: {e}")))?
}
