//! Command handlers that call the resolvers and render pretty JSON.

use nutrack_off::{OffClient, RawSearchParams, SearchParams};

/// Resolves `code` and pretty-prints the upstream body.
///
/// Non-JSON bodies are returned as text.
///
/// # Errors
///
/// Returns an error if the code is blank or every mirror failed.
pub(crate) async fn run_barcode(client: &OffClient, code: &str) -> anyhow::Result<String> {
    let product = client.lookup_barcode(code).await?;
    tracing::info!(
        source = %product.source_url,
        content_type = %product.content_type,
        "barcode resolved"
    );

    match serde_json::from_slice::<serde_json::Value>(&product.body) {
        Ok(value) => Ok(serde_json::to_string_pretty(&value)?),
        Err(_) => Ok(String::from_utf8_lossy(&product.body).into_owned()),
    }
}

/// Runs a search and pretty-prints the ranked body.
///
/// # Errors
///
/// Returns an error if the query is blank or both search tiers failed.
pub(crate) async fn run_search(
    client: &OffClient,
    raw: &RawSearchParams<'_>,
) -> anyhow::Result<String> {
    let params = SearchParams::from_raw(raw)?;
    let results = client.search(&params).await?;
    tracing::info!(
        tier = %results.tier,
        products = results.products().len(),
        "search resolved"
    );
    Ok(serde_json::to_string_pretty(&results.body)?)
}
