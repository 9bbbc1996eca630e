//! Remote speech synthesis client
//!
//! Thin wrapper around the relay's synthesis endpoint, which forwards the
//! text to a speech provider with a fixed voice and returns MP3 audio.

use serde::Serialize;

use super::endpoint_url;
use crate::{Error, Result};

/// Synthesis request
#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
}

/// Client for the speech-synthesis relay endpoint
pub struct SynthesisClient {
    client: reqwest::Client,
    url: String,
}

impl SynthesisClient {
    /// Create a synthesis client for the given relay base URL
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: endpoint_url(base_url, "/api/generate-audio"),
        })
    }

    /// Synthesize narration audio for the given text.
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Synthesis`] on network failure or a non-2xx response
    /// (carrying the status).
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(chars = text.len(), "starting speech synthesis");

        let response = self
            .client
            .post(&self.url)
            .json(&SynthesizeRequest { text })
            .send()
            .await
            .map_err(|e| Error::Synthesis {
                status: None,
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "synthesis API error");
            return Err(Error::Synthesis {
                status: Some(status.as_u16()),
                message: format!("synthesis API error {status}: {body}"),
            });
        }

        let audio = response.bytes().await.map_err(|e| Error::Synthesis {
            status: None,
            message: format!("audio stream read failed: {e}"),
        })?;

        tracing::info!(bytes = audio.len(), "narration synthesized");
        Ok(audio.to_vec())
    }
}
