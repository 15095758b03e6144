//! Shared HTTP client for the Open Food Facts mirrors.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Url};

use crate::error::OffError;
use crate::fetch::FetchOptions;
use crate::race::race_mirrors;
use crate::types::UpstreamResponse;

/// Client for a set of interchangeable Open Food Facts hosts.
///
/// Holds a pooled `reqwest::Client`, the mirror base URLs and the request
/// options every attempt uses (identification headers + per-attempt deadline).
/// Cheap to share behind an `Arc`; it carries no per-request state.
#[derive(Debug, Clone)]
pub struct OffClient {
    pub(crate) http: Client,
    pub(crate) mirrors: Vec<String>,
    pub(crate) options: FetchOptions,
}

impl OffClient {
    /// Creates a client racing `mirrors` with the given deadline and `User-Agent`.
    ///
    /// # Errors
    ///
    /// - [`OffError::NoMirrors`] if `mirrors` is empty.
    /// - [`OffError::InvalidMirror`] if a mirror is not an absolute http(s) URL
    ///   or the `User-Agent` is not a valid header value.
    /// - [`OffError::Http`] if the underlying `reqwest::Client` cannot be built.
    pub fn new<S: AsRef<str>>(
        mirrors: &[S],
        timeout_ms: u64,
        user_agent: &str,
    ) -> Result<Self, OffError> {
        if mirrors.is_empty() {
            return Err(OffError::NoMirrors);
        }

        let mirrors = mirrors
            .iter()
            .map(|m| normalize_mirror(m.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).map_err(|e| OffError::InvalidMirror {
                mirror: user_agent.to_owned(),
                reason: format!("user agent is not a valid header value: {e}"),
            })?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| OffError::Http {
                url: String::new(),
                source,
            })?;

        Ok(Self {
            http,
            mirrors,
            options: FetchOptions {
                headers,
                timeout: Duration::from_millis(timeout_ms),
                ..FetchOptions::default()
            },
        })
    }

    /// Mirror base URLs in configured order, without trailing slashes.
    #[must_use]
    pub fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.options.timeout
    }

    /// Builds one URL per mirror by appending `path_and_query` to each base.
    pub(crate) fn mirror_urls(&self, path_and_query: &str) -> Vec<String> {
        self.mirrors
            .iter()
            .map(|base| format!("{base}{path_and_query}"))
            .collect()
    }

    pub(crate) async fn race(&self, urls: &[String]) -> Result<UpstreamResponse, OffError> {
        race_mirrors(&self.http, urls, &self.options).await
    }
}

fn normalize_mirror(raw: &str) -> Result<String, OffError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|e| OffError::InvalidMirror {
        mirror: raw.to_owned(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(OffError::InvalidMirror {
            mirror: raw.to_owned(),
            reason: format!("unsupported scheme \"{}\"", parsed.scheme()),
        });
    }

    Ok(trimmed.to_owned())
}
