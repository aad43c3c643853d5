//! Shared HTTP plumbing for ESP adapters.

use reqwest::{Response, StatusCode};
use std::time::Duration;

use crate::ports::EspError;

/// ESP APIs can be slow; the client timeout is deliberately generous.
pub const ESP_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maps a reqwest transport failure to the ESP error taxonomy.
pub fn transport_error(err: reqwest::Error) -> EspError {
    if err.is_timeout() {
        EspError::Timeout {
            timeout_secs: ESP_HTTP_TIMEOUT.as_secs(),
        }
    } else if err.is_connect() {
        EspError::network(format!("Connection failed: {}", err))
    } else {
        EspError::network(err.to_string())
    }
}

/// Maps a non-success HTTP status to the ESP error taxonomy, consuming
/// the response body for context.
pub async fn status_error(response: Response) -> EspError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EspError::AuthenticationFailed,
        StatusCode::TOO_MANY_REQUESTS => EspError::RateLimited {
            retry_after_secs: 60,
        },
        StatusCode::NOT_FOUND => EspError::api("404", truncate(&body)),
        _ => EspError::api(status.as_str(), truncate(&body)),
    }
}

/// Checks a response, returning it on success.
pub async fn ensure_success(response: Response) -> Result<Response, EspError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}

fn truncate(body: &str) -> String {
    const MAX: usize = 256;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
