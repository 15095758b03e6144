use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension,
};

use crate::middleware::RequestId;

use super::{map_off_error, query_pairs, ApiError, AppState, RawQuery};

/// `GET /offBarcode?code=` — upstream product JSON, passed through verbatim.
pub(super) async fn resolve_barcode(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<RawQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = query_pairs("offBarcode", "missing_code", &req_id, query)?;
    let code = query.first("code").unwrap_or_default();
    let product = state
        .off
        .lookup_barcode(code)
        .await
        .map_err(|e| map_off_error("offBarcode", &req_id, &e))?;

    tracing::info!(
        request_id = %req_id.0,
        source = %product.source_url,
        bytes = product.body.len(),
        "barcode served"
    );

    Ok(([(header::CONTENT_TYPE, product.content_type)], product.body).into_response())
}
