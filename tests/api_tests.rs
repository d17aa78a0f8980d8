use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sieve::api::create_router;
use sieve::cache::{Cache, TtlPolicy};
use sieve::crawl_client::CrawlClient;
use sieve::search_client::SearchClient;
use sieve::tools::Toolbox;

async fn app(cache: Cache) -> (Router, MockServer, MockServer) {
    let searxng = MockServer::start().await;
    let crawl4ai = MockServer::start().await;
    let http = reqwest::Client::new();
    let toolbox = Toolbox::new(
        SearchClient::new(http.clone(), &searxng.uri(), Duration::from_secs(5)),
        CrawlClient::new(http, &crawl4ai.uri(), Duration::from_secs(5)),
        cache,
    );
    (create_router(Arc::new(toolbox)), searxng, crawl4ai)
}

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[cfg(test)]
mod status_routes {
    use super::*;

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let (router, _s, _c) = app(Cache::disabled()).await;
        let (status, body) = call(&router, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "sieve");
        assert!(
            body["endpoints"]
                .as_array()
                .unwrap()
                .contains(&json!("POST /tools/web_search"))
        );
    }

    #[tokio::test]
    async fn test_health() {
        let (router, searxng, crawl4ai) = app(Cache::in_memory(TtlPolicy::default())).await;
        Mock::given(method("GET"))
            .and(path("/healthz"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&searxng)
            .await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&crawl4ai)
            .await;
        let (status, body) = call(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["cache_backend"], "memory");
        assert_eq!(body["cache_connected"], true);
        assert_eq!(body["backends"], json!({"searxng": true, "crawl4ai": true}));
        assert_eq!(
            body["tools"],
            json!(["web_search", "web_crawl", "extract_content", "analyze_search_results"])
        );
    }
}

#[cfg(test)]
mod tool_routes {
    use super::*;

    #[tokio::test]
    async fn test_malformed_results_answer_with_error_object() {
        let (router, _s, _c) = app(Cache::disabled()).await;
        let (status, body) = call(
            &router,
            Method::POST,
            "/tools/analyze_search_results",
            Some(json!({"query": "cat", "results": "not json"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], "Invalid JSON in results parameter");
        assert_eq!(body["query"], "cat");
        assert!(body.get("analysis").is_none());
    }

    #[tokio::test]
    async fn test_non_json_body_answers_with_error_object() {
        let (router, _s, _c) = app(Cache::disabled()).await;
        for route in [
            "/tools/web_search",
            "/tools/web_crawl",
            "/tools/extract_content",
            "/tools/analyze_search_results",
        ] {
            let request = Request::builder()
                .method(Method::POST)
                .uri(route)
                .header("content-type", "text/plain")
                .body(Body::from("query=cat"))
                .unwrap();
            let response = router.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{route}");

            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["kind"], "invalid_request", "{route}");
            assert_eq!(body["error"], "Invalid request", "{route}");
        }
    }

    #[tokio::test]
    async fn test_broken_json_answers_with_error_object() {
        let (router, _s, _c) = app(Cache::disabled()).await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/tools/analyze_search_results")
            .header("content-type", "application/json")
            .body(Body::from("{\"query\": "))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "invalid_request");
    }

    #[tokio::test]
    async fn test_empty_results_analysis() {
        let (router, _s, _c) = app(Cache::disabled()).await;
        let (status, body) = call(
            &router,
            Method::POST,
            "/tools/analyze_search_results",
            Some(json!({"query": "cat", "results": "[]"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"], "No results to analyze");
        assert_eq!(body["total_results"], 0);
    }

    #[tokio::test]
    async fn test_unknown_content_type_is_rejected() {
        let (router, _s, _c) = app(Cache::disabled()).await;
        let (status, body) = call(
            &router,
            Method::POST,
            "/tools/extract_content",
            Some(json!({"url": "https://example.com", "content_type": "code"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "invalid_request");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_search_failure_same_status() {
        let (router, searxng, _c) = app(Cache::disabled()).await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&searxng)
            .await;

        let (status, body) = call(
            &router,
            Method::POST,
            "/tools/web_search",
            Some(json!({"query": "rust"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], "Search failed");
        assert_eq!(body["kind"], "transport_error");
    }

    #[tokio::test]
    async fn test_web_crawl_summary() {
        let (router, _s, crawl4ai) = app(Cache::in_memory(TtlPolicy::default())).await;
        Mock::given(method("POST"))
            .and(path("/crawl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "markdown": "m".repeat(1500),
                "metadata": {"title": "Long page"}
            })))
            .mount(&crawl4ai)
            .await;

        let (status, body) = call(
            &router,
            Method::POST,
            "/tools/web_crawl",
            Some(json!({"url": "https://example.com/long"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "https://example.com/long");
        assert_eq!(body["content_length"], 1500);
        assert_eq!(body["markdown_preview"].as_str().unwrap().len(), 1000);
        assert!(body.get("screenshot").is_none());
    }
}

#[cfg(test)]
mod crawl_service_routes {
    use super::*;

    #[tokio::test]
    async fn test_missing_result_is_404() {
        let (router, _s, _c) = app(Cache::in_memory(TtlPolicy::default())).await;
        let (status, body) = call(&router, Method::GET, "/result/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Result not found or expired");
    }

    #[tokio::test]
    async fn test_clear_cache_without_store_is_503() {
        let (router, _s, _c) = app(Cache::disabled()).await;
        let (status, body) = call(&router, Method::DELETE, "/cache/abc", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "cache_unavailable");
    }

    #[tokio::test]
    async fn test_crawl_then_fetch_by_job_id() {
        let (router, _s, crawl4ai) = app(Cache::in_memory(TtlPolicy::default())).await;
        Mock::given(method("POST"))
            .and(path("/crawl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "https://example.com",
                "markdown": "hello"
            })))
            .mount(&crawl4ai)
            .await;

        let (status, crawled) = call(
            &router,
            Method::POST,
            "/crawl",
            Some(json!({"url": "https://example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(crawled["markdown"], "hello");

        let (status, batch) = call(
            &router,
            Method::POST,
            "/crawl/batch",
            Some(json!({"urls": ["https://example.com"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let job_id = batch["jobs"][0]["job_id"].as_str().unwrap().to_string();

        // same options, so the batch job id points at the entry cached above
        let (status, fetched) = call(&router, Method::GET, &format!("/result/{job_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["markdown"], "hello");

        let (status, cleared) =
            call(&router, Method::DELETE, &format!("/cache/{job_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared["status"], "success");
    }

    #[tokio::test]
    async fn test_bad_crawl_request_is_400() {
        let (router, _s, _c) = app(Cache::disabled()).await;
        let (status, body) = call(
            &router,
            Method::POST,
            "/crawl",
            Some(json!({"url": "https://example.com", "extraction_strategy": "magic"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_request");
    }

    #[tokio::test]
    async fn test_non_json_crawl_request_is_structured_400() {
        let (router, _s, _c) = app(Cache::disabled()).await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/crawl")
            .header("content-type", "text/plain")
            .body(Body::from("https://example.com"))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "invalid_request");
    }
}
