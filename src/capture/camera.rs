//! Webcam frame grab
//!
//! Drives an external frame-grab tool (`ffmpeg` or `fswebcam`) to freeze one
//! frame from the default video device, then rasterizes it to a bounded
//! resolution at reduced quality to favor upload speed over fidelity.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use super::CaptureSource;
use crate::media::{self, EncodedImage};
use crate::{Error, Result};

/// Frame bound: wide enough for text recognition, small enough to upload fast
const MAX_WIDTH: u32 = 1600;
const MAX_HEIGHT: u32 = 1200;

/// JPEG quality for the rasterized frame
const JPEG_QUALITY: u8 = 80;

/// Which frame-grab tool drives the camera
#[derive(Clone, Copy, Debug)]
enum GrabTool {
    Ffmpeg,
    Fswebcam,
}

/// Grabs still frames from a video device
pub struct CameraSource {
    tool: GrabTool,
    device: String,
}

impl CameraSource {
    /// Probe for a usable camera: a grab tool on PATH plus a video device.
    ///
    /// Returns `None` when the capability is absent; the caller falls back
    /// to the file chooser.
    #[must_use]
    pub fn detect(device: Option<&str>) -> Option<Self> {
        let tool = if which::which("ffmpeg").is_ok() {
            GrabTool::Ffmpeg
        } else if which::which("fswebcam").is_ok() {
            GrabTool::Fswebcam
        } else {
            tracing::debug!("no frame-grab tool on PATH");
            return None;
        };

        let device = device.map_or_else(default_device, ToString::to_string);

        // On Linux the device is a node we can check for up front
        if cfg!(target_os = "linux") && !Path::new(&device).exists() {
            tracing::debug!(device = %device, "no video device node");
            return None;
        }

        tracing::debug!(tool = ?tool, device = %device, "camera detected");
        Some(Self { tool, device })
    }

    /// Build the grab command writing one frame to `out`
    fn grab_command(&self, out: &Path) -> Command {
        match self.tool {
            GrabTool::Ffmpeg => {
                let mut cmd = Command::new("ffmpeg");
                cmd.args(["-y", "-loglevel", "error"]);
                if cfg!(target_os = "linux") {
                    cmd.args(["-f", "v4l2"]);
                } else if cfg!(target_os = "macos") {
                    cmd.args(["-f", "avfoundation"]);
                }
                cmd.arg("-i").arg(&self.device);
                cmd.args(["-frames:v", "1"]).arg(out);
                cmd
            }
            GrabTool::Fswebcam => {
                let mut cmd = Command::new("fswebcam");
                cmd.args(["-q", "--no-banner"]);
                cmd.arg("-d").arg(&self.device);
                cmd.arg("--jpeg").arg(JPEG_QUALITY.to_string());
                cmd.arg(out);
                cmd
            }
        }
    }
}

#[async_trait]
impl CaptureSource for CameraSource {
    async fn acquire(&mut self) -> Result<EncodedImage> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("frame.jpg");

        let status = self
            .grab_command(&out)
            .status()
            .await
            .map_err(|e| Error::Capture(format!("frame grab failed to start: {e}")))?;

        if !status.success() {
            return Err(Error::Capture(format!("frame grab exited with {status}")));
        }

        let bytes = tokio::fs::read(&out)
            .await
            .map_err(|e| Error::Capture(format!("grabbed frame not readable: {e}")))?;

        // Rasterize to the upload-friendly bound off the async executor
        let frame = tokio::task::spawn_blocking(move || {
            media::rescale_jpeg(&bytes, MAX_WIDTH, MAX_HEIGHT, JPEG_QUALITY)
        })
        .await
        .map_err(|e| Error::Capture(format!("frame rasterize task failed: {e}")))??;

        tracing::debug!(
            width = frame.width(),
            height = frame.height(),
            bytes = frame.size_bytes(),
            "frame captured"
        );

        Ok(frame)
    }

    fn name(&self) -> &'static str {
        "camera"
    }
}

/// Default video device for the current platform
fn default_device() -> String {
    if cfg!(target_os = "linux") {
        "/dev/video0".to_string()
    } else {
        // avfoundation/dshow index addressing
        "0".to_string()
    }
}
