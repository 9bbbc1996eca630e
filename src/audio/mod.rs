//! Narration audio: resource lifecycle and playback
//!
//! The synthesis relay returns MP3 bytes; those become an [`AudioResource`]
//! owned by whichever [`AudioSink`] they are attached to. At most one
//! resource is ever live — attaching a new one releases the previous one.

mod playback;

use std::io::Cursor;

pub use playback::CpalPlayback;

use crate::{Error, Result};

/// Synthesized narration audio as returned by the speech relay (MP3 bytes).
///
/// Ownership-scoped: the sink holding it is responsible for releasing it,
/// and exactly one may be live at a time.
#[derive(Debug)]
pub struct AudioResource {
    bytes: Vec<u8>,
}

impl AudioResource {
    /// Wrap a synthesized audio payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if the payload is empty.
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Audio("empty audio payload".to_string()));
        }
        Ok(Self { bytes })
    }

    /// The encoded audio payload
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded payload size in bytes
    #[must_use]
    pub const fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Outcome of an automatic playback attempt.
///
/// `Blocked` is a platform condition, not an error: the resource stays
/// attached and manual controls take over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStart {
    /// Playback began automatically
    Started,
    /// The platform refused automatic playback; manual controls apply
    Blocked,
}

/// Current state of the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// No resource attached
    Idle,
    /// Audio is playing
    Playing,
    /// Resource attached but not playing (paused, blocked, or finished)
    Paused,
}

/// Where narration audio goes.
///
/// The concrete sink is [`CpalPlayback`]; tests substitute their own.
pub trait AudioSink {
    /// Attach a new resource, releasing any previously held one, and attempt
    /// automatic playback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if the payload cannot be decoded. A platform
    /// that refuses to start playback is NOT an error; that is
    /// [`PlaybackStart::Blocked`].
    fn attach(&mut self, resource: AudioResource) -> Result<PlaybackStart>;

    /// Begin or resume playback (a user gesture). Restarts from the top if
    /// the previous run played to the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if no resource is attached or the output
    /// stream cannot be started.
    fn play(&mut self) -> Result<()>;

    /// Pause playback, keeping the position
    fn pause(&mut self);

    /// Release the resource, rewind to the start, and reset control state
    fn stop(&mut self);

    /// Current playback status
    fn status(&self) -> PlaybackStatus;
}

/// Decode MP3 bytes to mono f32 samples plus their sample rate.
///
/// # Errors
///
/// Returns [`Error::Audio`] if the payload is not decodable MP3.
pub fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                #[allow(clippy::cast_sign_loss)]
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                }

                // Stereo frames are averaged down to mono
                let frame_samples: Vec<f32> = if frame.channels == 2 {
                    frame
                        .data
                        .chunks(2)
                        .map(|chunk| {
                            let left = f32::from(chunk[0]) / 32768.0;
                            let right =
                                f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                            f32::midpoint(left, right)
                        })
                        .collect()
                } else {
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect()
                };

                samples.extend(frame_samples);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(Error::Audio("no audio frames in payload".to_string()));
    }

    Ok((samples, sample_rate))
}
