//! Declarative view-state
//!
//! The driving surface renders whatever this says; state transitions drive
//! the view, never the other way around.

use crate::audio::PlaybackStatus;

use super::Stage;

/// What the driving surface should show right now
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ViewState {
    /// Capture trigger is available
    pub capture_button: bool,

    /// Captured image preview is visible
    pub preview: bool,

    /// Explicit read action is available (manual-advance mode)
    pub read_button: bool,

    /// Extracted text is visible
    pub text_panel: bool,

    /// Manual play control is visible
    pub play_button: bool,

    /// Pause control is visible
    pub pause_button: bool,

    /// "Take a new photo" action is available
    pub new_photo_button: bool,

    /// A stage is in flight; show the busy indicator
    pub busy: bool,

    /// One short user-facing message, if any
    pub banner: Option<String>,
}

impl ViewState {
    /// Derive the view from session state.
    ///
    /// Total over all stage and playback status combinations.
    #[must_use]
    pub fn derive(
        stage: Stage,
        playback: PlaybackStatus,
        auto_advance: bool,
        banner: Option<&str>,
    ) -> Self {
        let mut view = Self {
            capture_button: false,
            preview: false,
            read_button: false,
            text_panel: false,
            play_button: false,
            pause_button: false,
            new_photo_button: false,
            busy: false,
            banner: banner.map(ToString::to_string),
        };

        match stage {
            Stage::Idle => {
                view.capture_button = true;
            }
            Stage::Capturing => {
                view.busy = true;
            }
            Stage::Captured => {
                view.preview = true;
                view.read_button = !auto_advance;
                view.new_photo_button = true;
            }
            Stage::Extracting | Stage::Synthesizing => {
                view.preview = true;
                view.busy = true;
            }
            Stage::Playing => {
                view.text_panel = true;
                view.new_photo_button = true;
                match playback {
                    PlaybackStatus::Playing => view.pause_button = true,
                    PlaybackStatus::Paused | PlaybackStatus::Idle => view.play_button = true,
                }
            }
            Stage::TextOnly => {
                view.text_panel = true;
                view.new_photo_button = true;
            }
        }

        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_shows_capture_only() {
        let view = ViewState::derive(Stage::Idle, PlaybackStatus::Idle, true, None);
        assert!(view.capture_button);
        assert!(!view.play_button);
        assert!(!view.pause_button);
        assert!(!view.busy);
    }

    #[test]
    fn test_manual_mode_shows_read_button() {
        let view = ViewState::derive(Stage::Captured, PlaybackStatus::Idle, false, None);
        assert!(view.read_button);

        let auto = ViewState::derive(Stage::Captured, PlaybackStatus::Idle, true, None);
        assert!(!auto.read_button);
    }

    #[test]
    fn test_playing_toggles_controls_with_status() {
        let playing = ViewState::derive(Stage::Playing, PlaybackStatus::Playing, true, None);
        assert!(playing.pause_button);
        assert!(!playing.play_button);

        let paused = ViewState::derive(Stage::Playing, PlaybackStatus::Paused, true, None);
        assert!(paused.play_button);
        assert!(!paused.pause_button);
    }

    #[test]
    fn test_text_only_has_no_audio_controls() {
        let view = ViewState::derive(Stage::TextOnly, PlaybackStatus::Idle, true, Some("no audio"));
        assert!(view.text_panel);
        assert!(!view.play_button);
        assert!(!view.pause_button);
        assert_eq!(view.banner.as_deref(), Some("no audio"));
    }

    #[test]
    fn test_derivation_is_total() {
        let stages = [
            Stage::Idle,
            Stage::Capturing,
            Stage::Captured,
            Stage::Extracting,
            Stage::Synthesizing,
            Stage::Playing,
            Stage::TextOnly,
        ];
        let statuses = [
            PlaybackStatus::Idle,
            PlaybackStatus::Playing,
            PlaybackStatus::Paused,
        ];

        for stage in stages {
            for status in statuses {
                // Busy stages never offer interactive controls
                let view = ViewState::derive(stage, status, true, None);
                if view.busy {
                    assert!(!view.capture_button && !view.play_button && !view.pause_button);
                }
            }
        }
    }
}
