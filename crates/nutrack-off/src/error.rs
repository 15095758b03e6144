use thiserror::Error;

#[derive(Debug, Error)]
pub enum OffError {
    #[error("product code is required")]
    MissingCode,

    #[error("search query is required")]
    MissingQuery,

    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("HTTP error from {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("all {attempts} mirrors failed; last error: {last}")]
    AllMirrorsFailed { attempts: usize, last: Box<OffError> },

    #[error("no mirrors configured")]
    NoMirrors,

    #[error("invalid mirror URL \"{mirror}\": {reason}")]
    InvalidMirror { mirror: String, reason: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// How a terminal failure is surfaced to callers of the resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The request itself was unusable; no upstream call was made.
    MissingInput,
    UpstreamTimeout,
    UpstreamBadGateway,
}

impl OffError {
    /// Returns `true` when the root cause is an expired deadline.
    ///
    /// Looks through [`OffError::AllMirrorsFailed`] to the last error the race
    /// observed.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            OffError::Timeout { .. } => true,
            OffError::Http { source, .. } => source.is_timeout(),
            OffError::AllMirrorsFailed { last, .. } => last.is_timeout(),
            _ => false,
        }
    }

    #[must_use]
    pub fn class(&self) -> FailureClass {
        match self {
            OffError::MissingCode | OffError::MissingQuery => FailureClass::MissingInput,
            err if err.is_timeout() => FailureClass::UpstreamTimeout,
            _ => FailureClass::UpstreamBadGateway,
        }
    }
}
