//! Audio playback to the default output device
//!
//! The output stream is rebuilt on demand around a shared position cursor,
//! so pause/resume/replay survive stream teardown. Streams are not `Send`;
//! the sink lives on the main task.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use super::{AudioResource, AudioSink, PlaybackStart, PlaybackStatus, decode_mp3};
use crate::{Error, Result};

/// One attached narration: decoded samples plus the live stream, if any
struct ActiveAudio {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    position: Arc<AtomicUsize>,
    stream: Option<Stream>,
    playing: bool,
}

/// Plays narration through the default output device
#[derive(Default)]
pub struct CpalPlayback {
    active: Option<ActiveAudio>,
}

impl CpalPlayback {
    /// Create a playback sink.
    ///
    /// Device discovery is deferred to attach time, so construction always
    /// succeeds even on machines without audio hardware.
    #[must_use]
    pub const fn new() -> Self {
        Self { active: None }
    }

    /// Attach raw PCM samples and attempt automatic playback.
    ///
    /// Used directly by the speaker diagnostic; narration goes through
    /// [`AudioSink::attach`], which decodes MP3 first.
    pub fn attach_pcm(&mut self, samples: Vec<f32>, sample_rate: u32) -> PlaybackStart {
        // One live resource: drop the previous stream and samples first
        self.active = None;

        let mut active = ActiveAudio {
            samples: Arc::new(samples),
            sample_rate,
            position: Arc::new(AtomicUsize::new(0)),
            stream: None,
            playing: false,
        };

        let start = match build_stream(&active) {
            Ok(stream) => match stream.play() {
                Ok(()) => {
                    active.stream = Some(stream);
                    active.playing = true;
                    PlaybackStart::Started
                }
                Err(e) => {
                    tracing::info!(error = %e, "automatic playback refused, manual controls apply");
                    PlaybackStart::Blocked
                }
            },
            Err(e) => {
                tracing::info!(error = %e, "no usable output stream, manual controls apply");
                PlaybackStart::Blocked
            }
        };

        self.active = Some(active);
        start
    }
}

impl AudioSink for CpalPlayback {
    fn attach(&mut self, resource: AudioResource) -> Result<PlaybackStart> {
        let (samples, sample_rate) = decode_mp3(resource.bytes())?;
        tracing::debug!(
            bytes = resource.size_bytes(),
            samples = samples.len(),
            sample_rate,
            "narration decoded"
        );
        Ok(self.attach_pcm(samples, sample_rate))
    }

    fn play(&mut self) -> Result<()> {
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| Error::Audio("no narration attached".to_string()))?;

        // Played to the end: rewind for a replay
        if active.position.load(Ordering::Acquire) >= active.samples.len() {
            active.position.store(0, Ordering::Release);
            active.stream = None;
        }

        if active.stream.is_none() {
            let stream = build_stream(active)?;
            active.stream = Some(stream);
        }

        if let Some(stream) = &active.stream {
            stream
                .play()
                .map_err(|e| Error::Audio(format!("playback start failed: {e}")))?;
        }
        active.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(active) = &mut self.active {
            if let Some(stream) = &active.stream {
                if let Err(e) = stream.pause() {
                    // Backends without pause support: tear the stream down,
                    // position survives for resume
                    tracing::debug!(error = %e, "pause unsupported, stopping stream");
                    active.stream = None;
                }
            }
            active.playing = false;
        }
    }

    fn stop(&mut self) {
        if self.active.take().is_some() {
            tracing::debug!("narration released");
        }
    }

    fn status(&self) -> PlaybackStatus {
        self.active.as_ref().map_or(PlaybackStatus::Idle, |active| {
            if active.playing && active.position.load(Ordering::Acquire) < active.samples.len() {
                PlaybackStatus::Playing
            } else {
                PlaybackStatus::Paused
            }
        })
    }
}

/// Build an output stream reading from the shared position cursor
fn build_stream(active: &ActiveAudio) -> Result<Stream> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let rate = active.sample_rate;
    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(rate)
                && c.max_sample_rate() >= SampleRate(rate)
        })
        .or_else(|| {
            // Fallback: try stereo
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(rate)
                    && c.max_sample_rate() >= SampleRate(rate)
            })
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    let config: StreamConfig = supported_config.with_sample_rate(SampleRate(rate)).config();
    let channels = config.channels as usize;

    let samples = Arc::clone(&active.samples);
    let position = Arc::clone(&active.position);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = position.load(Ordering::Acquire);

                for frame in data.chunks_mut(channels) {
                    let sample = samples.get(pos).copied().unwrap_or(0.0);
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                    if pos < samples.len() {
                        pos += 1;
                    }
                }

                position.store(pos, Ordering::Release);
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = rate,
        channels = config.channels,
        "output stream built"
    );

    Ok(stream)
}
