//! Story Reader - photograph a storybook page and hear it read aloud
//!
//! This library implements the capture-to-playback pipeline:
//! - Image acquisition (camera frame grab or file chooser)
//! - Payload normalization (bound upload size)
//! - Remote text extraction and speech synthesis via relay endpoints
//! - Narration playback with manual-control fallback
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Capture Session                       │
//! │  idle → capturing → captured → extracting →          │
//! │         synthesizing → playing (or text-only)        │
//! └───────┬──────────────┬───────────────┬───────────────┘
//!         │              │               │
//! ┌───────▼─────┐ ┌──────▼──────┐ ┌──────▼──────────────┐
//! │  Acquisition │ │ Relay calls │ │ Playback Controller │
//! │ camera/file  │ │ extract/tts │ │ cpal + mp3 decode   │
//! └──────────────┘ └─────────────┘ └─────────────────────┘
//! ```
//!
//! The relay endpoints hold the AI-provider secrets; this crate never sees
//! them.

pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod media;
pub mod remote;
pub mod session;

pub use audio::{AudioResource, AudioSink, CpalPlayback, PlaybackStart, PlaybackStatus};
pub use capture::{CameraSource, CaptureSource, FileSource};
pub use config::Config;
pub use error::{Error, Result};
pub use media::EncodedImage;
pub use session::{CaptureSession, Stage, ViewState};
