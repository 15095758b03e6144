use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use nutrack_off::{RawSearchParams, SearchParams};

use crate::middleware::RequestId;

use super::{map_off_error, query_pairs, ApiError, AppState, RawQuery};

/// `GET /offSearch` — upstream search JSON with relevance-ordered `products`.
///
/// Values stay strings until `SearchParams::from_raw`, so malformed numbers
/// fall back to defaults instead of failing extraction.
pub(super) async fn resolve_search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<RawQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = query_pairs("offSearch", "missing_query", &req_id, query)?;
    let params = SearchParams::from_raw(&RawSearchParams {
        q: query.first("q"),
        page: query.first("page"),
        page_size: query.first("page_size"),
        lc: query.first("lc"),
        country: query.first("country"),
        fresh: query.first("fresh"),
    })
    .map_err(|e| map_off_error("offSearch", &req_id, &e))?;

    let results = state
        .off
        .search(&params)
        .await
        .map_err(|e| map_off_error("offSearch", &req_id, &e))?;

    tracing::info!(
        request_id = %req_id.0,
        query = %params.query,
        tier = %results.tier,
        products = results.products().len(),
        "search served"
    );

    Ok(Json(results.body))
}
