use std::{fmt, time::Duration};

use reqwest::{Client, Method, Request, Response, StatusCode};
use tokio::time::sleep;

use crate::warning;

/// Retries on top of the first attempt.
pub const MAX_RETRIES: usize = 3;

/// Longest `Retry-After` we are willing to sit out.
const MAX_RETRY_AFTER_SECS: u64 = 120;

#[derive(Debug)]
pub enum TransportError {
    Http(reqwest::Error),
    Status(StatusCode),
    NotCloneable,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Http(e) => write!(f, "request failed: {}", e),
            TransportError::Status(status) => write!(f, "unexpected status {}", status),
            TransportError::NotCloneable => write!(f, "request body cannot be replayed"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err)
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::PUT | Method::DELETE | Method::HEAD | Method::OPTIONS
    )
}

fn is_network_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

/// Sends `request`, retrying up to [`MAX_RETRIES`] times.
///
/// Network failures are retried for every method. 5xx and 429 responses are
/// retried only for idempotent methods, and a 429 waits out its
/// `Retry-After` when that is at most two minutes. There is no other delay
/// between attempts. Any final non-success status is returned as
/// [`TransportError::Status`].
pub async fn send_with_retry(client: &Client, request: Request) -> Result<Response, TransportError> {
    let idempotent = is_idempotent(request.method());
    let url = request.url().clone();
    let mut attempt = 0;

    loop {
        let retries_left = attempt < MAX_RETRIES;
        let current = if retries_left {
            request.try_clone().ok_or(TransportError::NotCloneable)?
        } else {
            // last attempt, the original can be consumed
            return finish(client.execute(request).await?);
        };
        attempt += 1;

        match client.execute(current).await {
            Ok(response) => {
                let status = response.status();
                if idempotent && is_retryable_status(status) {
                    warning!(
                        "{} {} returned {}, retrying ({}/{})",
                        request.method(),
                        url.path(),
                        status,
                        attempt,
                        MAX_RETRIES
                    );
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        if let Some(secs) = retry_after(&response) {
                            if secs <= MAX_RETRY_AFTER_SECS {
                                sleep(Duration::from_secs(secs)).await;
                            }
                        }
                    }
                    continue;
                }
                return finish(response);
            }
            Err(err) if is_network_error(&err) => {
                warning!(
                    "{} {} failed: {}, retrying ({}/{})",
                    request.method(),
                    url.path(),
                    err,
                    attempt,
                    MAX_RETRIES
                );
                continue;
            }
            Err(err) => return Err(TransportError::Http(err)),
        }
    }
}

fn finish(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TransportError::Status(status))
    }
}
