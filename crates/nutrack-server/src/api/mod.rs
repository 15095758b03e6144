mod barcode;
mod search;

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use nutrack_off::{FailureClass, OffClient, OffError};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::middleware::{
    cache_control_for, request_id, RequestId, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS,
    CORS_ALLOW_ORIGIN, CORS_VARY,
};

#[derive(Clone)]
pub struct AppState {
    pub off: Arc<OffClient>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Error body returned by every endpoint: `{"error": "<code>", "message": "<text>"}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    mirrors: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: code.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.as_str() {
            "missing_code" | "missing_query" => StatusCode::BAD_REQUEST,
            "upstream_timeout" => StatusCode::GATEWAY_TIMEOUT,
            "upstream_bad_gateway" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Maps a resolver failure to its response and logs it with the endpoint and
/// timeout/other classification.
pub(super) fn map_off_error(
    endpoint: &'static str,
    req_id: &RequestId,
    error: &OffError,
) -> ApiError {
    let request_id = req_id.0.as_str();
    match error.class() {
        FailureClass::MissingInput => {
            let code = match error {
                OffError::MissingQuery => "missing_query",
                _ => "missing_code",
            };
            tracing::debug!(endpoint, request_id, code, "rejected request without input");
            ApiError::new(code, error.to_string())
        }
        FailureClass::UpstreamTimeout => {
            tracing::error!(
                endpoint,
                request_id,
                class = "timeout",
                error = %error,
                "upstream request failed"
            );
            ApiError::new("upstream_timeout", error.to_string())
        }
        FailureClass::UpstreamBadGateway => {
            tracing::error!(
                endpoint,
                request_id,
                class = "bad_gateway",
                error = %error,
                "upstream request failed"
            );
            ApiError::new("upstream_bad_gateway", error.to_string())
        }
    }
}

/// Query string as ordered key/value pairs. Repeated keys are kept rather
/// than rejected.
pub(super) type RawQuery = Vec<(String, String)>;

/// Extracted query pairs; lookups resolve a repeated key to its first value.
#[derive(Debug)]
pub(super) struct QueryPairs(RawQuery);

impl QueryPairs {
    pub(super) fn first(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Unwraps the query extractor, turning a rejection into the endpoint's
/// missing-input error so the body stays JSON.
pub(super) fn query_pairs(
    endpoint: &'static str,
    code: &'static str,
    req_id: &RequestId,
    extracted: Result<Query<RawQuery>, QueryRejection>,
) -> Result<QueryPairs, ApiError> {
    match extracted {
        Ok(Query(pairs)) => Ok(QueryPairs(pairs)),
        Err(rejection) => {
            let message = rejection.body_text();
            tracing::debug!(
                endpoint,
                request_id = req_id.0.as_str(),
                code,
                error = %message,
                "rejected malformed query string"
            );
            Err(ApiError::new(code, message))
        }
    }
}

/// Answers a CORS preflight without touching upstream.
async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn off_router() -> Router<AppState> {
    Router::new()
        .route(
            "/offBarcode",
            get(barcode::resolve_barcode).options(preflight),
        )
        .route("/offSearch", get(search::resolve_search).options(preflight))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            cache_control_for,
        ))
}

pub fn build_app(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(off_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static(CORS_ALLOW_ORIGIN),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static(CORS_ALLOW_METHODS),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(CORS_ALLOW_HEADERS),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::VARY,
                    HeaderValue::from_static(CORS_VARY),
                )),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    Json(ApiResponse {
        data: HealthData {
            status: "ok",
            mirrors: state.off.mirrors().len(),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[cfg(test)]
mod tests;
