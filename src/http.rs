//! JSON-over-HTTP calls to model providers, with retry and backoff.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately with
//!   [`RagError::Provider`]
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! When retries run out the last failure is reported as
//! [`RagError::BackendUnavailable`].

use ragfile_core::{RagError, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Build an HTTP client with a per-request timeout.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RagError::Configuration(format!("failed to build HTTP client: {}", e)))
}

/// Delay before retry number `attempt` (1-based).
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt.saturating_sub(1).min(5))
}

/// A JSON POST request to one provider endpoint.
pub struct JsonRequest<'a> {
    /// Provider name used in log lines and error messages.
    pub provider: &'a str,
    pub url: &'a str,
    pub bearer: Option<&'a str>,
    pub body: &'a Value,
    pub max_retries: u32,
}

/// Send `request`, retrying transient failures, and decode the JSON reply.
pub async fn post_json(client: &reqwest::Client, request: JsonRequest<'_>) -> Result<Value> {
    let mut last_err = String::new();

    for attempt in 0..=request.max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            warn!(
                provider = request.provider,
                attempt,
                delay_secs = delay.as_secs(),
                error = %last_err,
                "retrying provider request"
            );
            tokio::time::sleep(delay).await;
        }

        let mut builder = client.post(request.url).json(request.body);
        if let Some(token) = request.bearer {
            builder = builder.bearer_auth(token);
        }

        match builder.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response.json::<Value>().await.map_err(|e| {
                        RagError::Provider(format!(
                            "{} returned an invalid JSON body: {}",
                            request.provider, e
                        ))
                    });
                }

                let body_text = response.text().await.unwrap_or_default();

                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = format!("{} API error {}: {}", request.provider, status, body_text);
                    continue;
                }

                return Err(RagError::Provider(format!(
                    "{} API error {}: {}",
                    request.provider, status, body_text
                )));
            }
            Err(e) => {
                last_err = format!(
                    "{} connection error ({}): {}",
                    request.provider, request.url, e
                );
                continue;
            }
        }
    }

    Err(RagError::BackendUnavailable(format!(
        "{} (after {} retries)",
        last_err, request.max_retries
    )))
}
