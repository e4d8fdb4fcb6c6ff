//! Shared HTTP response helpers for warehouse clients.
//!
//! Centralizes status-code checks (429 rate limiting with `Retry-After`
//! parsing, non-success → [`ProviderError::Api`]) and JSON decoding so the
//! BigQuery module stays focused on request construction and mapping.

use serde::de::DeserializeOwned;

use crate::error::ProviderError;

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success. Handles:
/// - **429 Too Many Requests** → [`ProviderError::RateLimited`] with
///   `Retry-After` header parsing (falls back to 60 s if absent or
///   unparseable).
/// - **Non-success status** → [`ProviderError::Api`] with status code and
///   response body.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    if resp.status() == 429 {
        let retry_after = parse_retry_after(&resp);
        return Err(ProviderError::RateLimited {
            retry_after_secs: retry_after,
        });
    }
    if !resp.status().is_success() {
        return Err(ProviderError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Read the body and decode it as JSON. Malformed payloads are fatal.
pub async fn read_json<T: DeserializeOwned>(
    resp: reqwest::Response,
    what: &str,
) -> Result<T, ProviderError> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Parse(format!("{what}: {e}")))
}

/// Parse the `Retry-After` header as seconds, falling back to 60 s.
fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}

#[cfg(test)]
pub(crate) fn mock_response(status: u16, body: &str) -> reqwest::Response {
    reqwest::Response::from(
        ::http::Response::builder()
            .status(status)
            .body(body.to_string())
            .unwrap(),
    )
}
