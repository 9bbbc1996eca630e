//! Remote text extraction client
//!
//! Thin wrapper around the relay's extraction endpoint, which forwards the
//! page image to a vision-capable model and returns only the page text.

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::endpoint_url;
use crate::media::EncodedImage;
use crate::{Error, Result};

/// Extraction request: the image payload, base64 encoded, no data-URL prefix
#[derive(Debug, Serialize)]
struct ExtractRequest {
    image: String,
}

/// Extraction response
#[derive(Debug, Deserialize)]
struct ExtractResponse {
    text: String,
}

/// Client for the text-extraction relay endpoint
pub struct ExtractionClient {
    client: reqwest::Client,
    url: String,
}

impl ExtractionClient {
    /// Create an extraction client for the given relay base URL
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: endpoint_url(base_url, "/api/extract-text"),
        })
    }

    /// Extract the page text from an image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Extraction`] on network failure, a non-2xx response
    /// (carrying the status), or a missing/empty text field.
    pub async fn extract(&self, img: &EncodedImage) -> Result<String> {
        let request = ExtractRequest {
            image: base64::engine::general_purpose::STANDARD.encode(img.bytes()),
        };

        tracing::debug!(
            bytes = img.size_bytes(),
            mime = img.mime(),
            "starting text extraction"
        );

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Extraction {
                status: None,
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "extraction API error");
            return Err(Error::Extraction {
                status: Some(status.as_u16()),
                message: format!("extraction API error {status}: {body}"),
            });
        }

        let result: ExtractResponse =
            response.json().await.map_err(|e| Error::Extraction {
                status: None,
                message: format!("malformed extraction response: {e}"),
            })?;

        if result.text.trim().is_empty() {
            return Err(Error::Extraction {
                status: None,
                message: "no text found in image".to_string(),
            });
        }

        tracing::info!(chars = result.text.len(), "text extracted");
        Ok(result.text)
    }
}
