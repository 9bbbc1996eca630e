//! TOML configuration file loading
//!
//! Supports `~/.config/storyread/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of
//! defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Relay endpoint configuration
    #[serde(default)]
    pub relay: RelayFileConfig,

    /// Image acquisition configuration
    #[serde(default)]
    pub capture: CaptureFileConfig,

    /// Payload normalization configuration
    #[serde(default)]
    pub normalize: NormalizeFileConfig,

    /// Session state machine configuration
    #[serde(default)]
    pub session: SessionFileConfig,

    /// Playback configuration
    #[serde(default)]
    pub playback: PlaybackFileConfig,
}

/// Relay endpoint settings
#[derive(Debug, Default, Deserialize)]
pub struct RelayFileConfig {
    /// Base URL of the relay
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

/// Image acquisition settings
#[derive(Debug, Default, Deserialize)]
pub struct CaptureFileConfig {
    /// Try the camera before the file chooser
    pub prefer_camera: Option<bool>,

    /// Video device override
    pub camera_device: Option<String>,

    /// Bound on a single acquisition, in seconds
    pub acquire_timeout_secs: Option<u64>,
}

/// Payload normalization settings
#[derive(Debug, Default, Deserialize)]
pub struct NormalizeFileConfig {
    /// Recompression threshold in bytes
    pub threshold_bytes: Option<usize>,

    /// Maximum width after rescale
    pub max_width: Option<u32>,

    /// Maximum height after rescale
    pub max_height: Option<u32>,

    /// JPEG re-encode quality (1-100)
    pub jpeg_quality: Option<u8>,
}

/// Session state machine settings
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Advance into extraction without an explicit read action
    pub auto_advance: Option<bool>,

    /// Debounce window in milliseconds
    pub debounce_ms: Option<u64>,
}

/// Playback settings
#[derive(Debug, Default, Deserialize)]
pub struct PlaybackFileConfig {
    /// Attempt automatic playback once narration is attached
    pub autoplay: Option<bool>,
}

/// Load the overlay: an explicit path must exist and parse; the standard
/// path falls back to defaults when missing or unreadable.
///
/// # Errors
///
/// Returns error only for an explicit path that is missing or malformed.
pub fn load(path: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = path {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("config file {}: {e}", path.display()))
        })?;
        return Ok(toml::from_str(&raw)?);
    }

    let Some(path) = default_path() else {
        return Ok(ConfigFile::default());
    };

    match std::fs::read_to_string(&path) {
        Ok(raw) => match toml::from_str(&raw) {
            Ok(parsed) => {
                tracing::debug!(path = %path.display(), "loaded config file");
                Ok(parsed)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "ignoring malformed config file"
                );
                Ok(ConfigFile::default())
            }
        },
        Err(_) => Ok(ConfigFile::default()),
    }
}

/// Standard config path: `<config dir>/storyread/config.toml`
fn default_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("storyread/config.toml"))
}
