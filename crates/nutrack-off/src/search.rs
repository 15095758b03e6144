//! Free-text product search with a v3 → v1 fallback.
//!
//! Both tiers race the mirror set with the same compact field projection. The
//! full-text v3 engine is tried first; an empty result list or an exhausted
//! race sends the query to the legacy v1 `search.pl` endpoint. The final list
//! is stably reordered so products whose name contains the query come first.

use reqwest::Url;
use serde_json::Value;

use crate::client::OffClient;
use crate::error::OffError;
use crate::types::{RawSearchParams, SearchResults, SearchTier, UpstreamResponse};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 50;
pub const DEFAULT_LOCALE: &str = "en";

/// Fields requested from both tiers.
pub const SEARCH_FIELDS: &str =
    "code,product_name,brands,nutriments,serving_size,image_front_small_url,nutriscore_grade";

/// Legacy-engine sort key (popularity).
const V1_SORT_BY: &str = "unique_scans_n";

/// Normalized search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub page: u32,
    pub page_size: u32,
    pub locale: String,
    /// Lower-cased country code, if any.
    pub country: Option<String>,
    /// Ask upstream caches to be bypassed.
    pub fresh: bool,
}

impl SearchParams {
    /// Validates and normalizes raw query parameters.
    ///
    /// Page values that are missing or not integers fall back to the defaults
    /// before clamping: `page >= 1`, `1 <= page_size <= 50`.
    ///
    /// # Errors
    ///
    /// Returns [`OffError::MissingQuery`] if the query is missing or blank.
    pub fn from_raw(raw: &RawSearchParams<'_>) -> Result<Self, OffError> {
        let query = raw
            .q
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(OffError::MissingQuery)?
            .to_owned();

        let page = clamp_u32(parse_int(raw.page, DEFAULT_PAGE), 1, u32::MAX);
        let page_size = clamp_u32(
            parse_int(raw.page_size, DEFAULT_PAGE_SIZE),
            1,
            MAX_PAGE_SIZE,
        );

        let locale = raw
            .lc
            .map(str::trim)
            .filter(|lc| !lc.is_empty())
            .unwrap_or(DEFAULT_LOCALE)
            .to_owned();

        let country = raw
            .country
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty());

        Ok(Self {
            query,
            page,
            page_size,
            locale,
            country,
            fresh: raw.fresh == Some("1"),
        })
    }

    fn v3_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.query.clone()),
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
            ("fields", SEARCH_FIELDS.to_owned()),
            ("lc", self.locale.clone()),
        ];
        self.push_filters(&mut pairs);
        pairs
    }

    fn v1_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("search_terms", self.query.clone()),
            ("search_simple", "1".to_owned()),
            ("action", "process".to_owned()),
            ("json", "1".to_owned()),
            ("sort_by", V1_SORT_BY.to_owned()),
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
            ("fields", SEARCH_FIELDS.to_owned()),
            ("lc", self.locale.clone()),
        ];
        self.push_filters(&mut pairs);
        pairs
    }

    fn push_filters(&self, pairs: &mut Vec<(&'static str, String)>) {
        if let Some(country) = &self.country {
            pairs.push(("cc", country.clone()));
        }
        if self.fresh {
            pairs.push(("nocache", "1".to_owned()));
        }
    }
}

fn parse_int(raw: Option<&str>, default: u32) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or_else(|| i64::from(default))
}

fn clamp_u32(value: i64, min: u32, max: u32) -> u32 {
    let clamped = value.clamp(i64::from(min), i64::from(max));
    u32::try_from(clamped).unwrap_or(min)
}

/// Stably moves products whose `product_name` contains `query`
/// (case-insensitive) ahead of the rest. Order inside each group is kept.
#[must_use]
pub fn rank_by_relevance(mut products: Vec<Value>, query: &str) -> Vec<Value> {
    let needle = query.trim().to_lowercase();
    products.sort_by_key(|product| {
        let name = product
            .get("product_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        !name.contains(&needle)
    });
    products
}

/// Number of products in a buffered body; zero for non-JSON, a non-object
/// body, or a missing or non-list `products` field.
fn product_count(body: &[u8]) -> usize {
    serde_json::from_slice::<Value>(body)
        .ok()
        .as_ref()
        .and_then(Value::as_object)
        .and_then(|object| object.get("products"))
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

impl OffClient {
    /// Searches the mirrors, preferring the v3 engine and falling back to v1.
    ///
    /// # Errors
    ///
    /// - [`OffError::AllMirrorsFailed`] if the v1 race fails and the v3 race
    ///   produced no usable body.
    /// - [`OffError::Deserialize`] if the chosen body is not JSON.
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResults, OffError> {
        let v3_urls = self.search_urls("/api/v3/search", &params.v3_pairs())?;

        let empty_primary = match self.race(&v3_urls).await {
            Ok(response) if product_count(&response.body) > 0 => {
                return finish(response, SearchTier::V3, &params.query);
            }
            Ok(response) => {
                tracing::warn!(
                    query = %params.query,
                    "v3 search returned no products; trying v1"
                );
                Some(response)
            }
            Err(err) => {
                tracing::warn!(
                    query = %params.query,
                    error = %err,
                    "v3 search failed; trying v1"
                );
                None
            }
        };

        let v1_urls = self.search_urls("/cgi/search.pl", &params.v1_pairs())?;
        match self.race(&v1_urls).await {
            Ok(response) => finish(response, SearchTier::V1, &params.query),
            Err(err) => match empty_primary {
                Some(response) => {
                    tracing::warn!(
                        query = %params.query,
                        error = %err,
                        "v1 search failed; serving empty v3 result"
                    );
                    finish(response, SearchTier::V3, &params.query)
                }
                None => Err(err),
            },
        }
    }

    fn search_urls(
        &self,
        path: &str,
        pairs: &[(&'static str, String)],
    ) -> Result<Vec<String>, OffError> {
        self.mirror_urls(path)
            .into_iter()
            .map(|raw| {
                let mut url = Url::parse(&raw).map_err(|e| OffError::InvalidMirror {
                    mirror: raw.clone(),
                    reason: e.to_string(),
                })?;
                url.query_pairs_mut()
                    .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())));
                Ok(url.to_string())
            })
            .collect()
    }
}

/// Parses the chosen tier's body once and applies the relevance reorder.
fn finish(
    response: UpstreamResponse,
    tier: SearchTier,
    query: &str,
) -> Result<SearchResults, OffError> {
    let mut body: Value =
        serde_json::from_slice(&response.body).map_err(|source| OffError::Deserialize {
            context: format!("{tier} search body from {}", response.url),
            source,
        })?;

    let products = match body.get_mut("products").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    let ranked = rank_by_relevance(products, query);

    if !body.is_object() {
        body = Value::Object(serde_json::Map::new());
    }
    body["products"] = Value::Array(ranked);

    tracing::debug!(%tier, url = %response.url, "search resolved");
    Ok(SearchResults { tier, body })
}

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;
