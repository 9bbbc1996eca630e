//! Relay endpoint clients
//!
//! The pipeline depends on two opaque remote services behind an HTTP relay:
//! text extraction (vision model) and speech synthesis. The relay holds the
//! provider secrets; nothing here ever sees them.

mod extract;
mod synthesize;

use std::time::Duration;

pub use extract::ExtractionClient;
pub use synthesize::SynthesisClient;

/// Join the relay base URL with an endpoint path
fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

/// Best-effort reachability probe of the relay's health endpoint.
///
/// Logged only, never fatal: the pipeline works the same whether or not the
/// probe succeeds.
pub async fn probe_health(base_url: &str) {
    let url = endpoint_url(base_url, "/health");

    let client = reqwest::Client::new();
    match client
        .get(&url)
        .timeout(Duration::from_secs(3))
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            tracing::debug!(url = %url, "relay reachable");
        }
        Ok(response) => {
            tracing::warn!(
                url = %url,
                status = %response.status(),
                "relay health probe returned error"
            );
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "relay health probe failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_cleanly() {
        assert_eq!(
            endpoint_url("http://localhost:3000/", "/api/extract-text"),
            "http://localhost:3000/api/extract-text"
        );
        assert_eq!(
            endpoint_url("http://localhost:3000", "/health"),
            "http://localhost:3000/health"
        );
    }
}
