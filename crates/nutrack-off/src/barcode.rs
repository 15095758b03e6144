//! Barcode → product payload.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::client::OffClient;
use crate::error::OffError;
use crate::types::ProductLookup;

/// Characters left unescaped in a path segment: alphanumerics plus `-_.!~*'()`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub(crate) const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Strips all whitespace from a scanned or typed product code.
///
/// Returns `None` when nothing is left.
#[must_use]
pub fn normalize_code(raw: &str) -> Option<String> {
    let code: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    (!code.is_empty()).then_some(code)
}

/// Path of the product endpoint for an already-normalized code.
#[must_use]
pub fn product_path(code: &str) -> String {
    format!(
        "/api/v2/product/{}.json",
        utf8_percent_encode(code, PATH_SEGMENT)
    )
}

impl OffClient {
    /// Resolves a product code by racing every mirror's product endpoint.
    ///
    /// The winning body is returned untouched, along with the upstream content
    /// type (`application/json` when the mirror sent none).
    ///
    /// # Errors
    ///
    /// - [`OffError::MissingCode`] if `raw_code` is blank; no request is made.
    /// - [`OffError::AllMirrorsFailed`] if no mirror answered with a 2xx.
    pub async fn lookup_barcode(&self, raw_code: &str) -> Result<ProductLookup, OffError> {
        let code = normalize_code(raw_code).ok_or(OffError::MissingCode)?;
        let urls = self.mirror_urls(&product_path(&code));

        let response = self.race(&urls).await?;
        tracing::debug!(code = %code, url = %response.url, "barcode resolved");

        Ok(ProductLookup {
            content_type: response
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned()),
            body: response.body,
            source_url: response.url,
        })
    }
}
