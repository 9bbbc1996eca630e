//! Capture session state machine
//!
//! One session is the unit of work for a photo-to-narration attempt:
//! acquire an image, normalize it, extract its text, synthesize narration,
//! play it back. Every failure routes back here, and the session decides
//! whether that means a full reset (most failures) or a degraded terminal
//! state (synthesis failures — the text is still worth showing).
//!
//! Execution is a single logical flow on one task; the `processing` guard
//! and the debounce window stand in for mutual exclusion across runs. There
//! is no true cancellation of an in-flight remote call — a result landing
//! after a reset is simply discarded with the rest of the run's state.

mod view;

use std::path::PathBuf;
use std::time::Instant;

use uuid::Uuid;

pub use view::ViewState;

use crate::audio::{AudioResource, AudioSink, PlaybackStart};
use crate::capture::{CaptureSource, FileSource};
use crate::config::Config;
use crate::media::{self, EncodedImage, NormalizeLimits};
use crate::remote::{ExtractionClient, SynthesisClient};
use crate::{Error, Result};

/// User-visible pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Waiting for a capture trigger
    Idle,
    /// Acquiring an image
    Capturing,
    /// Image acquired and validated, awaiting read (or auto-advancing)
    Captured,
    /// Awaiting remote text extraction
    Extracting,
    /// Awaiting remote speech synthesis
    Synthesizing,
    /// Narration attached; play/pause available
    Playing,
    /// Text available but no audio; terminal for the run
    TextOnly,
}

/// The capture-to-narration session
pub struct CaptureSession<S: AudioSink> {
    camera: Option<Box<dyn CaptureSource>>,
    picker: FileSource,
    extraction: ExtractionClient,
    synthesis: SynthesisClient,
    sink: S,

    normalize: NormalizeLimits,
    auto_advance: bool,
    autoplay: bool,
    debounce: std::time::Duration,
    acquire_timeout: std::time::Duration,
    ready_poll_attempts: u32,
    ready_poll_interval: std::time::Duration,

    stage: Stage,
    image: Option<EncodedImage>,
    text: Option<String>,
    processing: bool,
    last_trigger: Option<Instant>,
    banner: Option<String>,
    run_id: Option<Uuid>,
    run_started: Option<Instant>,
}

impl<S: AudioSink> CaptureSession<S> {
    /// Create a session from configuration plus its collaborators.
    ///
    /// `camera` is the optional preferred strategy; the file chooser is
    /// always present as the fallback.
    ///
    /// # Errors
    ///
    /// Returns error if the relay clients cannot be built
    pub fn new(
        config: &Config,
        camera: Option<Box<dyn CaptureSource>>,
        picker: FileSource,
        sink: S,
    ) -> Result<Self> {
        let extraction = ExtractionClient::new(
            &config.endpoints.base_url,
            config.endpoints.request_timeout,
        )?;
        let synthesis = SynthesisClient::new(
            &config.endpoints.base_url,
            config.endpoints.request_timeout,
        )?;

        Ok(Self {
            camera,
            picker,
            extraction,
            synthesis,
            sink,
            normalize: config.normalize.clone(),
            auto_advance: config.session.auto_advance,
            autoplay: config.playback.autoplay,
            debounce: config.session.debounce,
            acquire_timeout: config.capture.acquire_timeout,
            ready_poll_attempts: config.session.ready_poll_attempts,
            ready_poll_interval: config.session.ready_poll_interval,
            stage: Stage::Idle,
            image: None,
            text: None,
            processing: false,
            last_trigger: None,
            banner: None,
            run_id: None,
            run_started: None,
        })
    }

    /// Debounced capture trigger.
    ///
    /// Starts a run through the preferred strategy (camera when present,
    /// falling back to the file chooser). Triggers inside the debounce
    /// window, or while a run is processing, are ignored.
    pub async fn trigger_capture(&mut self) {
        if !self.accept_trigger() {
            return;
        }

        self.begin_run();
        if let Err(e) = self.capture(true).await {
            self.fail(&e);
        }
    }

    /// Deliver a file-selection event from the driving surface.
    ///
    /// Some platforms fire selection events twice; a selection landing while
    /// another is processing is a no-op.
    pub async fn file_selected(&mut self, path: PathBuf) {
        if self.processing {
            tracing::debug!("selection ignored, previous one still processing");
            return;
        }

        self.begin_run();
        self.picker.select(path);
        if let Err(e) = self.capture(false).await {
            self.fail(&e);
        }
    }

    /// Explicit read action: advance a captured image into extraction.
    ///
    /// A no-op outside the captured stage. Auto-advance mode performs this
    /// on capture completion.
    pub async fn read(&mut self) {
        if self.stage != Stage::Captured {
            tracing::debug!(stage = ?self.stage, "read ignored");
            return;
        }
        if let Err(e) = self.advance().await {
            self.fail(&e);
        }
    }

    /// Begin or resume playback (user gesture)
    pub fn play(&mut self) {
        if self.stage != Stage::Playing {
            tracing::debug!(stage = ?self.stage, "play ignored");
            return;
        }
        if let Err(e) = self.sink.play() {
            tracing::warn!(error = %e, "manual play failed");
        }
    }

    /// Pause playback, keeping position
    pub fn pause(&mut self) {
        if self.stage == Stage::Playing {
            self.sink.pause();
        }
    }

    /// Start over with a fresh photo: full reset, debounce clock cleared
    pub fn new_photo(&mut self) {
        tracing::debug!("new photo requested");
        self.last_trigger = None;
        self.reset();
    }

    /// The declarative view for the driving surface to render
    #[must_use]
    pub fn view(&self) -> ViewState {
        ViewState::derive(
            self.stage,
            self.sink.status(),
            self.auto_advance,
            self.banner.as_deref(),
        )
    }

    /// Current pipeline stage
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether an acquisition is currently being processed
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        self.processing
    }

    /// Current user-facing banner, if any
    #[must_use]
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Text extracted by the current run, if any
    #[must_use]
    pub fn extracted_text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Accept or reject a capture trigger: debounce plus re-entrancy guard
    fn accept_trigger(&mut self) -> bool {
        let now = Instant::now();

        if let Some(last) = self.last_trigger {
            if now.duration_since(last) < self.debounce {
                tracing::debug!(since = ?now.duration_since(last), "capture trigger debounced");
                return false;
            }
        }
        if self.processing {
            tracing::debug!("capture trigger ignored, run in progress");
            return false;
        }

        self.last_trigger = Some(now);
        true
    }

    /// Claim the guard and open a fresh run
    fn begin_run(&mut self) {
        let id = Uuid::new_v4();
        self.banner = None;
        self.processing = true;
        self.run_id = Some(id);
        self.run_started = Some(Instant::now());
        self.set_stage(Stage::Capturing);
        tracing::info!(run = %id, "pipeline run started");
    }

    /// Acquire, validate, and normalize an image, then advance
    async fn capture(&mut self, use_camera: bool) -> Result<()> {
        let image = self.acquire(use_camera).await?;

        tracing::debug!(
            mime = image.mime(),
            width = image.width(),
            height = image.height(),
            bytes = image.size_bytes(),
            "image acquired"
        );

        self.ensure_ready(&image).await?;

        let limits = self.normalize.clone();
        let normalized = tokio::task::spawn_blocking(move || media::normalize(image, &limits))
            .await
            .map_err(|e| Error::Validation(format!("normalize task failed: {e}")))??;

        self.image = Some(normalized);
        // Validated and normalized: the guard's span ends here
        self.processing = false;
        self.set_stage(Stage::Captured);

        if self.auto_advance {
            self.advance().await?;
        }
        Ok(())
    }

    /// Run the configured acquisition strategies, bounded by the acquire
    /// timeout. Camera failures fall back to the file chooser.
    async fn acquire(&mut self, use_camera: bool) -> Result<EncodedImage> {
        if use_camera {
            if let Some(camera) = self.camera.as_mut() {
                match tokio::time::timeout(self.acquire_timeout, camera.acquire()).await {
                    Ok(Ok(img)) => return Ok(img),
                    Ok(Err(e)) => {
                        tracing::warn!(
                            error = %e,
                            "camera capture failed, falling back to file chooser"
                        );
                    }
                    Err(_) => {
                        tracing::warn!("camera capture timed out, falling back to file chooser");
                    }
                }
            }
        }

        match tokio::time::timeout(self.acquire_timeout, self.picker.acquire()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Capture(format!(
                "file read timed out after {:?}",
                self.acquire_timeout
            ))),
        }
    }

    /// Confirm the image fully decodes before it goes on the wire.
    ///
    /// The decode runs on the blocking pool; its completion signal is polled
    /// with bounded retries, since decode completion is not synchronously
    /// observable everywhere.
    async fn ensure_ready(&self, image: &EncodedImage) -> Result<()> {
        let handle = media::begin_decode(image);

        for attempt in 0..self.ready_poll_attempts {
            if handle.is_finished() {
                tracing::trace!(attempt, "image decode ready");
                return handle
                    .await
                    .map_err(|e| Error::Validation(format!("decode task failed: {e}")))?;
            }
            tokio::time::sleep(self.ready_poll_interval).await;
        }

        if handle.is_finished() {
            return handle
                .await
                .map_err(|e| Error::Validation(format!("decode task failed: {e}")))?;
        }

        handle.abort();
        Err(Error::Validation(format!(
            "image never became ready after {} attempts",
            self.ready_poll_attempts
        )))
    }

    /// Captured -> Extracting -> Synthesizing -> Playing (or TextOnly)
    async fn advance(&mut self) -> Result<()> {
        let Some(image) = self.image.clone() else {
            return Err(Error::Validation("no captured image to read".to_string()));
        };

        self.set_stage(Stage::Extracting);
        let text = self.extraction.extract(&image).await?;
        if text.trim().is_empty() {
            return Err(Error::Extraction {
                status: None,
                message: "no text found in image".to_string(),
            });
        }
        self.text = Some(text.clone());

        self.set_stage(Stage::Synthesizing);
        match self.synthesize_and_attach(&text).await {
            Ok(start) => {
                if start == PlaybackStart::Blocked {
                    tracing::info!("automatic playback unavailable, manual controls shown");
                } else if !self.autoplay {
                    self.sink.pause();
                }
                self.set_stage(Stage::Playing);
            }
            Err(e) => {
                // The text is still worth showing without narration
                tracing::warn!(error = %e, "narration unavailable, continuing with text only");
                self.banner = Some(e.user_message().to_string());
                self.set_stage(Stage::TextOnly);
            }
        }

        self.log_run_done();
        Ok(())
    }

    /// Synthesize narration and hand it to the sink
    async fn synthesize_and_attach(&mut self, text: &str) -> Result<PlaybackStart> {
        let audio = self.synthesis.synthesize(text).await?;
        let resource = AudioResource::new(audio)?;
        self.sink.attach(resource)
    }

    /// Route a failure: release resources, reset to capture-ready, surface
    /// one short message
    fn fail(&mut self, error: &Error) {
        tracing::error!(
            run = ?self.run_id,
            stage = ?self.stage,
            error = %error,
            "pipeline run failed"
        );
        let banner = error.user_message().to_string();
        self.reset();
        self.banner = Some(banner);
    }

    /// Full reset to capture-ready: audio released, chooser re-armed,
    /// guard cleared
    fn reset(&mut self) {
        self.sink.stop();
        self.picker.rearm();
        self.image = None;
        self.text = None;
        self.processing = false;
        self.banner = None;
        self.run_id = None;
        self.run_started = None;
        self.set_stage(Stage::Idle);
    }

    fn set_stage(&mut self, stage: Stage) {
        if self.stage != stage {
            tracing::debug!(
                run = ?self.run_id,
                from = ?self.stage,
                to = ?stage,
                "stage transition"
            );
            self.stage = stage;
        }
    }

    fn log_run_done(&self) {
        if let (Some(id), Some(started)) = (self.run_id, self.run_started) {
            tracing::info!(
                run = %id,
                stage = ?self.stage,
                elapsed = ?started.elapsed(),
                "pipeline run finished"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::audio::PlaybackStatus;

    /// Sink that records liveness and never touches hardware
    #[derive(Default)]
    struct RecordingSink {
        live: bool,
    }

    impl AudioSink for RecordingSink {
        fn attach(&mut self, _resource: AudioResource) -> Result<PlaybackStart> {
            self.live = true;
            Ok(PlaybackStart::Started)
        }

        fn play(&mut self) -> Result<()> {
            Ok(())
        }

        fn pause(&mut self) {}

        fn stop(&mut self) {
            self.live = false;
        }

        fn status(&self) -> PlaybackStatus {
            if self.live {
                PlaybackStatus::Playing
            } else {
                PlaybackStatus::Idle
            }
        }
    }

    /// Camera stand-in that always fails
    struct BrokenCamera;

    #[async_trait]
    impl CaptureSource for BrokenCamera {
        async fn acquire(&mut self) -> Result<EncodedImage> {
            Err(Error::Capture("no device".to_string()))
        }

        fn name(&self) -> &'static str {
            "broken-camera"
        }
    }

    fn make_session() -> CaptureSession<RecordingSink> {
        let config = Config::default();
        CaptureSession::new(
            &config,
            None,
            FileSource::new(false),
            RecordingSink::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_triggers_inside_debounce_window_are_rejected() {
        let mut session = make_session();

        assert!(session.accept_trigger());
        // Immediately again: inside the window
        assert!(!session.accept_trigger());
    }

    #[test]
    fn test_new_photo_resets_debounce_clock() {
        let mut session = make_session();

        assert!(session.accept_trigger());
        session.new_photo();
        assert!(session.accept_trigger());
    }

    #[test]
    fn test_trigger_rejected_while_processing() {
        let mut session = make_session();
        session.processing = true;
        session.last_trigger = None;

        assert!(!session.accept_trigger());
    }

    #[tokio::test]
    async fn test_selection_event_is_noop_while_processing() {
        let mut session = make_session();
        session.processing = true;
        session.stage = Stage::Capturing;

        session.file_selected(PathBuf::from("page.jpg")).await;

        // The second event changed nothing: no queued selection, no reset
        assert!(!session.picker.has_selection());
        assert_eq!(session.stage(), Stage::Capturing);
        assert!(session.is_processing());
    }

    #[tokio::test]
    async fn test_missing_file_run_resets_with_banner() {
        let mut session = make_session();

        session.file_selected(PathBuf::from("/nonexistent/page.jpg")).await;

        assert_eq!(session.stage(), Stage::Idle);
        assert!(!session.is_processing());
        assert!(session.banner().is_some());
    }

    #[tokio::test]
    async fn test_camera_failure_falls_back_to_chooser() {
        let config = Config::default();
        let mut session = CaptureSession::new(
            &config,
            Some(Box::new(BrokenCamera)),
            FileSource::new(false),
            RecordingSink::default(),
        )
        .unwrap();

        // Chooser has nothing queued either, so the run fails -- but only
        // after the fallback was taken, which is what the banner reflects
        session.trigger_capture().await;
        assert_eq!(session.stage(), Stage::Idle);
        assert!(!session.is_processing());
        assert!(session.banner().is_some());
    }

    #[tokio::test]
    async fn test_read_ignored_outside_captured_stage() {
        let mut session = make_session();
        session.read().await;
        assert_eq!(session.stage(), Stage::Idle);
    }
}
