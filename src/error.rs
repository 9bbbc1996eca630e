//! Error types for the Story Reader pipeline

use thiserror::Error;

/// Result type alias for Story Reader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the capture-to-narration pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Image acquisition error (device, permission, unreadable file)
    #[error("capture error: {0}")]
    Capture(String),

    /// Image validation error (malformed or not-yet-ready payload)
    #[error("validation error: {0}")]
    Validation(String),

    /// Text extraction failure (network, non-2xx, or empty text)
    #[error("extraction error: {message}")]
    Extraction {
        /// HTTP status of the relay response, when one was received
        status: Option<u16>,
        message: String,
    },

    /// Speech synthesis failure (network or non-2xx)
    #[error("synthesis error: {message}")]
    Synthesis {
        /// HTTP status of the relay response, when one was received
        status: Option<u16>,
        message: String,
    },

    /// Audio decode or playback error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// One short, non-technical message suitable for the user-facing banner.
    ///
    /// Full detail goes to the log only; end users never see raw errors.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Capture(_) | Self::Io(_) => "Couldn't get that photo. Please try again!",
            Self::Validation(_) => {
                "That photo didn't come through. Please try taking another one!"
            }
            Self::Extraction { .. } => {
                "Sorry, I couldn't read the text from your book. Please try another photo!"
            }
            Self::Synthesis { .. } | Self::Audio(_) => {
                "I can show you the text, but audio isn't working right now."
            }
            Self::Http(_) => {
                "A network error occurred. Please check your connection and try again."
            }
            Self::Config(_) | Self::Serialization(_) | Self::Toml(_) => {
                "Something went wrong. Please try again."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_non_technical() {
        let errors = [
            Error::Capture("v4l2 open failed".to_string()),
            Error::Validation("truncated jpeg".to_string()),
            Error::Extraction {
                status: Some(500),
                message: "relay exploded".to_string(),
            },
            Error::Synthesis {
                status: None,
                message: "connection refused".to_string(),
            },
        ];

        for err in errors {
            let msg = err.user_message();
            // Banner text never leaks status codes or internal detail
            assert!(!msg.contains("500"));
            assert!(!msg.contains("v4l2"));
            assert!(msg.len() < 100);
        }
    }
}
