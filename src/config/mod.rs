//! Configuration for the Story Reader pipeline
//!
//! Layered: built-in defaults, then an optional TOML file at the platform
//! config dir, then `STORYREAD_*` environment overrides.

pub mod file;

use std::path::Path;
use std::time::Duration;

use crate::media::NormalizeLimits;
use crate::{Error, Result};

/// Default relay base URL (a local relay during development)
const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Story Reader configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Relay endpoints
    pub endpoints: EndpointConfig,

    /// Image acquisition
    pub capture: CaptureConfig,

    /// Payload size normalization
    pub normalize: NormalizeLimits,

    /// Session state machine knobs
    pub session: SessionConfig,

    /// Playback behavior
    pub playback: PlaybackConfig,
}

/// Relay endpoint configuration
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Base URL of the relay (endpoints live under `/api/`)
    pub base_url: String,

    /// Per-request timeout for both remote calls
    pub request_timeout: Duration,
}

/// Image acquisition configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Try the camera first; the file chooser remains the fallback
    pub prefer_camera: bool,

    /// Video device override (e.g. `/dev/video2`)
    pub camera_device: Option<String>,

    /// Bound on a single acquisition (frame grab or file read)
    pub acquire_timeout: Duration,
}

/// Session state machine configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Advance from captured straight into extraction without an explicit
    /// read action
    pub auto_advance: bool,

    /// Minimum gap between accepted capture triggers
    pub debounce: Duration,

    /// Decode readiness: maximum poll attempts before declaring failure
    pub ready_poll_attempts: u32,

    /// Decode readiness: gap between poll attempts
    pub ready_poll_interval: Duration,
}

/// Playback configuration
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Attempt to start narration automatically once attached
    pub autoplay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                request_timeout: Duration::from_secs(60),
            },
            capture: CaptureConfig {
                prefer_camera: true,
                camera_device: None,
                acquire_timeout: Duration::from_secs(10),
            },
            normalize: NormalizeLimits::default(),
            session: SessionConfig {
                auto_advance: true,
                debounce: Duration::from_millis(1000),
                ready_poll_attempts: 30,
                ready_poll_interval: Duration::from_millis(100),
            },
            playback: PlaybackConfig { autoplay: true },
        }
    }
}

impl Config {
    /// Load configuration: defaults, TOML overlay, then env overrides.
    ///
    /// An explicit `path` must exist and parse; the standard path is
    /// best-effort.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file is missing or malformed, or
    /// if the merged configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let overlay = file::load(path)?;

        let mut config = Self::default();
        config.apply_overlay(&overlay);
        config.apply_env();
        config.validate()?;

        Ok(config)
    }

    /// Merge the TOML overlay into defaults
    fn apply_overlay(&mut self, overlay: &file::ConfigFile) {
        if let Some(url) = &overlay.relay.base_url {
            self.endpoints.base_url.clone_from(url);
        }
        if let Some(secs) = overlay.relay.request_timeout_secs {
            self.endpoints.request_timeout = Duration::from_secs(secs);
        }

        if let Some(prefer) = overlay.capture.prefer_camera {
            self.capture.prefer_camera = prefer;
        }
        if let Some(device) = &overlay.capture.camera_device {
            self.capture.camera_device = Some(device.clone());
        }
        if let Some(secs) = overlay.capture.acquire_timeout_secs {
            self.capture.acquire_timeout = Duration::from_secs(secs);
        }

        if let Some(bytes) = overlay.normalize.threshold_bytes {
            self.normalize.threshold_bytes = bytes;
        }
        if let Some(width) = overlay.normalize.max_width {
            self.normalize.max_width = width;
        }
        if let Some(height) = overlay.normalize.max_height {
            self.normalize.max_height = height;
        }
        if let Some(quality) = overlay.normalize.jpeg_quality {
            self.normalize.jpeg_quality = quality;
        }

        if let Some(auto) = overlay.session.auto_advance {
            self.session.auto_advance = auto;
        }
        if let Some(ms) = overlay.session.debounce_ms {
            self.session.debounce = Duration::from_millis(ms);
        }

        if let Some(autoplay) = overlay.playback.autoplay {
            self.playback.autoplay = autoplay;
        }
    }

    /// Apply `STORYREAD_*` environment overrides
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("STORYREAD_BASE_URL") {
            if !url.is_empty() {
                self.endpoints.base_url = url;
            }
        }
        if let Ok(value) = std::env::var("STORYREAD_PREFER_CAMERA") {
            self.capture.prefer_camera = value != "0" && !value.eq_ignore_ascii_case("false");
        }
        if let Ok(device) = std::env::var("STORYREAD_CAMERA_DEVICE") {
            if !device.is_empty() {
                self.capture.camera_device = Some(device);
            }
        }
    }

    /// Reject configurations the pipeline cannot run with
    fn validate(&self) -> Result<()> {
        if self.endpoints.base_url.is_empty() {
            return Err(Error::Config("relay base URL must not be empty".to_string()));
        }
        if self.normalize.jpeg_quality == 0 || self.normalize.jpeg_quality > 100 {
            return Err(Error::Config(format!(
                "jpeg quality out of range: {}",
                self.normalize.jpeg_quality
            )));
        }
        if self.session.ready_poll_attempts == 0 {
            return Err(Error::Config(
                "ready_poll_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
