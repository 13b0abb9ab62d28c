//! Shared HTTP plumbing for the Drive, embedding, and index clients.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use reqwest::StatusCode;

use drive_ingest_core::{IngestError, Service};

/// Longest response body quoted in an error message.
const MAX_ERROR_BODY: usize = 300;

pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client, IngestError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| IngestError::config(format!("failed to build HTTP client: {}", e)))
}

/// Delay before retry number `attempt` (1-based).
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt.saturating_sub(1).min(5))
}

pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send the request produced by `build`, retrying transient failures.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed
/// by `send`. Returns the first successful response.
pub async fn send_with_retry<F>(
    service: Service,
    max_retries: u32,
    mut build: F,
) -> Result<reqwest::Response, IngestError>
where
    F: FnMut() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            tracing::debug!(%service, attempt, delay_secs = delay.as_secs(), "retrying");
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                let body = response.text().await.unwrap_or_default();
                let err = IngestError::transient(
                    service,
                    format!("HTTP {}: {}", status, truncate(&body, MAX_ERROR_BODY)),
                );
                if is_retryable(status) {
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
            Err(e) => {
                last_err = Some(IngestError::transient(service, e));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| IngestError::transient(service, "request failed after retries")))
}

/// Parse a successful response body as JSON.
pub async fn json_body<T: serde::de::DeserializeOwned>(
    service: Service,
    response: reqwest::Response,
) -> Result<T, IngestError> {
    response
        .json::<T>()
        .await
        .map_err(|e| IngestError::transient(service, format!("invalid response: {}", e)))
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
