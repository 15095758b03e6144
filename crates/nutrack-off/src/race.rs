//! First-success race across interchangeable mirrors.

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;

use crate::error::OffError;
use crate::fetch::{fetch_with_timeout, FetchOptions};
use crate::types::UpstreamResponse;

/// Issues the same request to every URL concurrently and returns the first
/// 2xx response.
///
/// There is no priority among `urls`: whichever attempt completes first with a
/// success status wins. Failed attempts (non-2xx, transport error, timeout)
/// only decrement the outstanding count, so the race fails once every attempt
/// has finished, never earlier. Attempts still in flight when a winner arrives
/// are dropped along with the race.
///
/// # Errors
///
/// - [`OffError::NoMirrors`] if `urls` is empty.
/// - [`OffError::AllMirrorsFailed`] carrying the last observed failure when no
///   attempt succeeded.
pub async fn race_mirrors(
    client: &Client,
    urls: &[String],
    options: &FetchOptions,
) -> Result<UpstreamResponse, OffError> {
    if urls.is_empty() {
        return Err(OffError::NoMirrors);
    }

    let mut attempts: FuturesUnordered<_> = urls
        .iter()
        .map(|url| fetch_with_timeout(client, url, options))
        .collect();
    let mut outstanding = urls.len();
    let mut last_error = OffError::NoMirrors;

    while let Some(result) = attempts.next().await {
        outstanding -= 1;
        match result {
            Ok(response) if response.status.is_success() => {
                tracing::debug!(url = %response.url, outstanding, "mirror won race");
                return Ok(response);
            }
            Ok(response) => {
                tracing::debug!(
                    url = %response.url,
                    status = response.status.as_u16(),
                    outstanding,
                    "mirror returned non-success status"
                );
                last_error = OffError::UnexpectedStatus {
                    status: response.status.as_u16(),
                    url: response.url,
                };
            }
            Err(err) => {
                tracing::debug!(error = %err, outstanding, "mirror attempt failed");
                last_error = err;
            }
        }
    }

    Err(OffError::AllMirrorsFailed {
        attempts: urls.len(),
        last: Box::new(last_error),
    })
}
