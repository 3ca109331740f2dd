//! Shared send loop with exponential backoff

use crate::LlmError;
use reqwest::blocking::Response;
use reqwest::StatusCode;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Send a request up to `max_retries` times
///
/// Connection failures, 429 and 5xx responses are retried with a 1s, 2s,
/// 4s... backoff. 404 means the model is missing and is returned at once,
/// as is any other client error. A successful response is handed back
/// unread.
pub(crate) fn send_with_retry<F>(
    max_retries: u32,
    model: &str,
    mut send: F,
) -> Result<Response, LlmError>
where
    F: FnMut() -> reqwest::Result<Response>,
{
    let max_retries = max_retries.max(1);
    let mut attempts = 0;
    let mut last_error = None;

    while attempts < max_retries {
        match send() {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                if status == StatusCode::NOT_FOUND {
                    return Err(LlmError::ModelNotAvailable(model.to_string()));
                }

                let error_text = response
                    .text()
                    .unwrap_or_else(|_| "Unknown error".to_string());
                if status == StatusCode::TOO_MANY_REQUESTS {
                    last_error = Some(LlmError::RateLimitExceeded);
                } else if status.is_server_error() {
                    last_error = Some(LlmError::Communication(format!(
                        "HTTP {}: {}",
                        status, error_text
                    )));
                } else {
                    return Err(LlmError::Communication(format!(
                        "HTTP {}: {}",
                        status, error_text
                    )));
                }
            }
            Err(e) => {
                last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
            }
        }

        attempts += 1;
        if attempts < max_retries {
            let delay = Duration::from_secs(2u64.pow(attempts - 1));
            warn!(attempt = attempts, ?delay, "Request failed, retrying");
            thread::sleep(delay);
        }
    }

    debug!(attempts, "Giving up after retries");
    Err(last_error
        .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
}
