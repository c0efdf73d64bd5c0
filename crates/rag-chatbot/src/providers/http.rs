//! Shared HTTP plumbing for the remote providers

use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use crate::error::{Error, Result};

/// Build a client whose every request is bounded by `timeout_secs`
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_max_idle_per_host(8)
        .build()
        .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))
}

/// Map a non-success status to the error taxonomy
pub fn classify_status(service: &str, status: StatusCode, body: &str) -> Error {
    let detail = format!("{} returned HTTP {}: {}", service, status.as_u16(), truncate(body, 300));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication(detail),
        StatusCode::NOT_FOUND => Error::NotFound(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => Error::TransientApi(detail),
        s if s.is_server_error() => Error::TransientApi(detail),
        _ => Error::InvalidRequest(detail),
    }
}

/// Pass successful responses through; turn the rest into errors
pub async fn check_response(service: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(service, status, &body))
}

fn truncate(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
