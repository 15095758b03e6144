//! Single outbound request with a hard deadline.

use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method};

use crate::error::OffError;
use crate::types::UpstreamResponse;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Method, injected headers and deadline shared by every attempt of a race.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Sends one request and buffers its body, giving up after `options.timeout`.
///
/// Sending and reading the body share a single deadline. When it expires the
/// in-flight future is dropped, which aborts the connection attempt. Non-2xx
/// statuses are returned as-is; judging them is the caller's job.
///
/// # Errors
///
/// - [`OffError::Timeout`] if the deadline elapses first.
/// - [`OffError::Http`] on connection, TLS or body-read failure.
pub async fn fetch_with_timeout(
    client: &Client,
    url: &str,
    options: &FetchOptions,
) -> Result<UpstreamResponse, OffError> {
    let request = client
        .request(options.method.clone(), url)
        .headers(options.headers.clone());

    let attempt = async {
        let http_err = |source| OffError::Http {
            url: url.to_owned(),
            source,
        };

        let response = request.send().await.map_err(http_err)?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(http_err)?.to_vec();

        Ok::<_, OffError>(UpstreamResponse {
            url: url.to_owned(),
            status,
            content_type,
            body,
        })
    };

    match tokio::time::timeout(options.timeout, attempt).await {
        Ok(result) => result,
        Err(_elapsed) => Err(OffError::Timeout {
            url: url.to_owned(),
            timeout_ms: u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
