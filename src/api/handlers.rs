use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::data_models::{CrawlRequest, CrawlResult};
use crate::error::ToolError;
use crate::tools::{SERVICE_NAME, Toolbox};

use super::models::{
    AnalyzeParams, BatchCrawlRequest, BatchCrawlResponse, ClearCacheResponse, ENDPOINTS,
    ExtractParams, HealthReport, SearchParams, ServiceInfo,
};

type Body = Result<Json<Value>, JsonRejection>;

/// Decodes a request body; a missing or non-JSON body is an invalid request.
fn parse_body<T: DeserializeOwned>(body: Body) -> Result<T, ToolError> {
    let Json(value) =
        body.map_err(|rejection| ToolError::InvalidRequest(rejection.body_text()))?;
    serde_json::from_value(value).map_err(|e| ToolError::InvalidRequest(e.to_string()))
}

/// Tool routes always answer 200; failures travel as the error payload.
fn tool_reply<T: Serialize>(tool: &str, outcome: Result<T, ToolError>) -> Json<Value> {
    let body = outcome.and_then(|value| {
        serde_json::to_value(value).map_err(|e| ToolError::InvalidRequest(e.to_string()))
    });
    match body {
        Ok(value) => Json(value),
        Err(e) => {
            tracing::warn!(tool, kind = e.kind(), error = %e, "tool call failed");
            Json(serde_json::to_value(e.payload()).unwrap_or(Value::Null))
        }
    }
}

pub async fn web_search_handler(
    State(toolbox): State<Arc<Toolbox>>,
    body: Body,
) -> Json<Value> {
    let outcome = match parse_body::<SearchParams>(body) {
        Ok(params) => toolbox.web_search(&params).await,
        Err(e) => Err(e),
    };
    tool_reply("web_search", outcome)
}

pub async fn web_crawl_handler(
    State(toolbox): State<Arc<Toolbox>>,
    body: Body,
) -> Json<Value> {
    let outcome = match parse_body::<CrawlRequest>(body) {
        Ok(request) => toolbox.web_crawl(&request).await,
        Err(e) => Err(e),
    };
    tool_reply("web_crawl", outcome)
}

pub async fn extract_content_handler(
    State(toolbox): State<Arc<Toolbox>>,
    body: Body,
) -> Json<Value> {
    let outcome = match parse_body::<ExtractParams>(body) {
        Ok(params) => toolbox.extract_content(&params).await,
        Err(e) => Err(e),
    };
    tool_reply("extract_content", outcome)
}

pub async fn analyze_handler(
    State(toolbox): State<Arc<Toolbox>>,
    body: Body,
) -> Json<Value> {
    let outcome = parse_body::<AnalyzeParams>(body)
        .and_then(|params| toolbox.analyze_search_results(&params));
    tool_reply("analyze_search_results", outcome)
}

pub async fn crawl_handler(
    State(toolbox): State<Arc<Toolbox>>,
    body: Body,
) -> Result<Json<CrawlResult>, ToolError> {
    let request: CrawlRequest = parse_body(body)?;
    Ok(Json(toolbox.crawl(&request).await?))
}

pub async fn batch_crawl_handler(
    State(toolbox): State<Arc<Toolbox>>,
    body: Body,
) -> Result<Json<BatchCrawlResponse>, ToolError> {
    let request: BatchCrawlRequest = parse_body(body)?;
    Ok(Json(toolbox.batch_crawl(&request)?))
}

pub async fn result_handler(
    State(toolbox): State<Arc<Toolbox>>,
    Path(job_id): Path<String>,
) -> Result<Json<CrawlResult>, ToolError> {
    Ok(Json(toolbox.get_result(&job_id).await?))
}

pub async fn clear_cache_handler(
    State(toolbox): State<Arc<Toolbox>>,
    Path(job_id): Path<String>,
) -> Result<Json<ClearCacheResponse>, ToolError> {
    Ok(Json(toolbox.clear_cache(&job_id).await?))
}

pub async fn health_handler(State(toolbox): State<Arc<Toolbox>>) -> Json<HealthReport> {
    Json(toolbox.health().await)
}

pub async fn root_handler() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}
