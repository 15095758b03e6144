use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::middleware::CACHE_POLICY;

fn app_for(servers: &[&MockServer], timeout_ms: u64) -> Router {
    let mirrors: Vec<String> = servers.iter().map(|s| s.uri()).collect();
    let off = OffClient::new(&mirrors, timeout_ms, "nutrack-test/0.1 (test@example.com)")
        .expect("client construction");
    build_app(AppState { off: Arc::new(off) })
}

async fn send(app: Router, method: &str, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request"),
    )
    .await
    .expect("response")
}

async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

fn assert_cors(response: &Response<Body>) {
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET, OPTIONS");
    assert_eq!(
        headers["access-control-allow-headers"],
        "Content-Type, Authorization"
    );
    assert_eq!(headers["vary"], "Origin");
}

async fn untouchable_mirror() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    server
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("missing_code", StatusCode::BAD_REQUEST),
        ("missing_query", StatusCode::BAD_REQUEST),
        ("upstream_timeout", StatusCode::GATEWAY_TIMEOUT),
        ("upstream_bad_gateway", StatusCode::BAD_GATEWAY),
        ("surprise", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new(code, "msg").into_response();
        assert_eq!(response.status(), status, "code={code}");
    }
}

#[tokio::test]
async fn options_requests_are_acknowledged_without_upstream_calls() {
    let mirror = untouchable_mirror().await;

    for uri in ["/offBarcode?code=123", "/offSearch?q=milk"] {
        let response = send(app_for(&[&mirror], 1000), "OPTIONS", uri).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT, "{uri}");
        assert_cors(&response);
        assert!(response.headers().get("cache-control").is_none());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }
}

#[tokio::test]
async fn barcode_without_code_is_rejected_before_upstream() {
    let mirror = untouchable_mirror().await;

    for uri in ["/offBarcode", "/offBarcode?code=%20%20"] {
        let response = send(app_for(&[&mirror], 1000), "GET", uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_cors(&response);
        let json = json_body(response).await;
        assert_eq!(json["error"], "missing_code");
    }
}

#[tokio::test]
async fn barcode_serves_the_fastest_mirror() {
    let fast = MockServer::start().await;
    let slow = MockServer::start().await;
    // The slow attempt is cancelled by the fast answer and may never arrive.
    for (server, delay_ms, tag, expected) in [
        (&fast, 50, "fast", 1..=1),
        (&slow, 200, "slow", 0..=1),
    ] {
        Mock::given(method("GET"))
            .and(path("/api/v2/product/5901234123457.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": "5901234123457", "mirror": tag}))
                    .set_delay(Duration::from_millis(delay_ms)),
            )
            .expect(expected)
            .mount(server)
            .await;
    }

    let started = Instant::now();
    let response = send(
        app_for(&[&slow, &fast], 2000),
        "GET",
        "/offBarcode?code=5901234123457",
    )
    .await;

    assert!(started.elapsed() < Duration::from_millis(200));
    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    assert_eq!(response.headers()["cache-control"], CACHE_POLICY);
    assert_eq!(response.headers()["content-type"], "application/json");
    let json = json_body(response).await;
    assert_eq!(json["mirror"], "fast");
}

#[tokio::test]
async fn barcode_timeout_maps_to_504() {
    let a = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&a)
        .await;

    let response = send(app_for(&[&a], 80), "GET", "/offBarcode?code=42").await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_cors(&response);
    assert!(response.headers().get("cache-control").is_none());
    let json = json_body(response).await;
    assert_eq!(json["error"], "upstream_timeout");
    assert!(json["message"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn barcode_upstream_errors_map_to_502() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    for server in [&a, &b] {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
    }

    let response = send(app_for(&[&a, &b], 1000), "GET", "/offBarcode?code=42").await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_cors(&response);
    let json = json_body(response).await;
    assert_eq!(json["error"], "upstream_bad_gateway");
    assert!(json["message"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn search_without_query_is_rejected_before_upstream() {
    let mirror = untouchable_mirror().await;

    let response = send(app_for(&[&mirror], 1000), "GET", "/offSearch?q=%20&page=2").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_cors(&response);
    let json = json_body(response).await;
    assert_eq!(json["error"], "missing_query");
}

#[test]
fn repeated_query_keys_resolve_to_the_first_value() {
    let pairs = QueryPairs(vec![
        ("q".to_owned(), "milk".to_owned()),
        ("page".to_owned(), "2".to_owned()),
        ("q".to_owned(), "oat".to_owned()),
    ]);
    assert_eq!(pairs.first("q"), Some("milk"));
    assert_eq!(pairs.first("page"), Some("2"));
    assert_eq!(pairs.first("lc"), None);
}

#[tokio::test]
async fn search_with_repeated_query_uses_the_first_value() {
    let a = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/search"))
        .and(query_param("q", "milk"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"products": [{"product_name": "Whole Milk"}]})),
        )
        .expect(1)
        .mount(&a)
        .await;

    let response = send(app_for(&[&a], 2000), "GET", "/offSearch?q=milk&q=oat").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    assert_eq!(response.headers()["content-type"], "application/json");
    let json = json_body(response).await;
    assert_eq!(json["products"][0]["product_name"], "Whole Milk");
}

#[tokio::test]
async fn barcode_with_repeated_code_uses_the_first_value() {
    let a = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/product/111.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": "111"})))
        .expect(1)
        .mount(&a)
        .await;

    let response = send(app_for(&[&a], 2000), "GET", "/offBarcode?code=111&code=222").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    let json = json_body(response).await;
    assert_eq!(json["code"], "111");
}

#[tokio::test]
async fn search_falls_back_to_v1_and_reorders_products() {
    let a = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/search"))
        .and(query_param("q", "milk"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"products": []})))
        .expect(1)
        .mount(&a)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi/search.pl"))
        .and(query_param("search_terms", "milk"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "page": 2,
            "products": [
                {"code": "1", "product_name": "Butter"},
                {"code": "2", "product_name": "Oat Milk"},
                {"code": "3", "product_name": "MILKSHAKE"}
            ]
        })))
        .expect(1)
        .mount(&a)
        .await;

    let response = send(
        app_for(&[&a], 2000),
        "GET",
        "/offSearch?q=milk&page=2&page_size=10",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    assert_eq!(response.headers()["cache-control"], CACHE_POLICY);
    assert_eq!(response.headers()["content-type"], "application/json");
    let json = json_body(response).await;
    let codes: Vec<&str> = json["products"]
        .as_array()
        .expect("products array")
        .iter()
        .map(|p| p["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["2", "3", "1"]);
    assert_eq!(json["count"], 3);
}

#[tokio::test]
async fn search_clamps_page_size_before_calling_upstream() {
    let a = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/search"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "50"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"products": [{"product_name": "milk"}]})),
        )
        .expect(1)
        .mount(&a)
        .await;

    let response = send(
        app_for(&[&a], 2000),
        "GET",
        "/offSearch?q=milk&page=-4&page_size=999",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn search_with_both_tiers_down_maps_to_502() {
    let a = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&a)
        .await;

    let response = send(app_for(&[&a], 1000), "GET", "/offSearch?q=milk").await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_cors(&response);
    let json = json_body(response).await;
    assert_eq!(json["error"], "upstream_bad_gateway");
}

#[tokio::test]
async fn health_reports_mirror_count_and_echoes_request_id() {
    let a = untouchable_mirror().await;
    let b = untouchable_mirror().await;

    let response = app_for(&[&a, &b], 1000)
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["mirrors"], 2);
    assert_eq!(json["meta"]["request_id"], "req-123");
}
