use reqwest::StatusCode;

/// A fully buffered upstream reply.
///
/// The body is read once inside the bounded fetch, so callers can inspect it
/// (e.g. to decide on a search fallback) and still parse it afterwards.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub url: String,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Product payload resolved from a barcode, passed through verbatim.
#[derive(Debug, Clone)]
pub struct ProductLookup {
    pub content_type: String,
    pub body: Vec<u8>,
    /// Mirror URL that won the race.
    pub source_url: String,
}

/// Search query parameters exactly as the caller supplied them.
#[derive(Debug, Clone, Default)]
pub struct RawSearchParams<'a> {
    pub q: Option<&'a str>,
    pub page: Option<&'a str>,
    pub page_size: Option<&'a str>,
    pub lc: Option<&'a str>,
    pub country: Option<&'a str>,
    pub fresh: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTier {
    /// Full-text `/api/v3/search`.
    V3,
    /// Legacy `/cgi/search.pl`.
    V1,
}

impl std::fmt::Display for SearchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchTier::V3 => write!(f, "v3"),
            SearchTier::V1 => write!(f, "v1"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchResults {
    pub tier: SearchTier,
    /// Upstream JSON object with `products` replaced by the reordered list.
    pub body: serde_json::Value,
}

impl SearchResults {
    #[must_use]
    pub fn products(&self) -> &[serde_json::Value] {
        self.body
            .get("products")
            .and_then(serde_json::Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
