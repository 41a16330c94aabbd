//! Rate-limit aware request retry.
//!
//! The remote API signals an exhausted request allowance with `429 Too Many
//! Requests` or `503 Service Unavailable`. [`fetch_with_retry`] waits
//! `2^(attempt + 1)` seconds (2 s, 4 s, 8 s, ...) after each such response and
//! sends the request again. Every other status is handed back immediately, and
//! once the retries are used up the last rate-limited response is returned as
//! is. Callers inspect the status themselves and turn failures into errors
//! with [`status_error`].
//!
//! Transport errors (DNS, connect, timeout) are returned without retrying.

use std::future::Future;
use std::time::Duration;

use docket_core::error::AppError;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Anything that carries an HTTP status code.
pub trait StatusResponse {
    fn status_code(&self) -> u16;
}

impl StatusResponse for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

/// Returns true for the statuses the remote API uses to signal rate limiting.
pub fn is_rate_limited(status: u16) -> bool {
    status == 429 || status == 503
}

/// Error for a non-success response that [`fetch_with_retry`] handed back.
///
/// A rate-limited status at this point means the retries ran out.
pub fn status_error(status: u16, url: String) -> AppError {
    if is_rate_limited(status) {
        AppError::RateLimitExceeded
    } else {
        AppError::HttpStatus { status, url }
    }
}

/// Backoff before retry number `attempt + 1` (zero-based).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use docket_client::fetch::backoff_delay;
///
/// assert_eq!(backoff_delay(0), Duration::from_secs(2));
/// assert_eq!(backoff_delay(2), Duration::from_secs(8));
/// ```
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2_u64.saturating_pow(attempt.saturating_add(1)))
}

/// Sends a request, retrying rate-limited responses with exponential backoff.
///
/// `send` is called once per attempt and must build a fresh request each
/// time. At most `max_retries` retries are made, so the request is sent at
/// most `max_retries + 1` times.
///
/// # Errors
///
/// Only errors returned by `send` itself are propagated.
pub async fn fetch_with_retry<R, F, Fut>(mut send: F, max_retries: u32) -> Result<R, AppError>
where
    R: StatusResponse,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, AppError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let response = send().await?;
        let status = response.status_code();

        if !is_rate_limited(status) {
            return Ok(response);
        }

        if attempt >= max_retries {
            warn!(status, retries = attempt, "Rate limit retries exhausted");
            return Ok(response);
        }

        let delay = backoff_delay(attempt);
        debug!(
            status,
            retry = attempt + 1,
            delay_secs = delay.as_secs(),
            "Rate limited, backing off"
        );
        sleep(delay).await;
        attempt += 1;
    }
}
