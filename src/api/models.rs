use serde::{Deserialize, Serialize};

pub use crate::tools::{
    AnalyzeParams, BatchCrawlRequest, BatchCrawlResponse, ClearCacheResponse, ExtractParams,
    HealthReport, SearchParams, SearchResponse,
};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

pub const ENDPOINTS: [&str; 10] = [
    "GET /",
    "GET /health",
    "POST /tools/web_search",
    "POST /tools/web_crawl",
    "POST /tools/extract_content",
    "POST /tools/analyze_search_results",
    "POST /crawl",
    "POST /crawl/batch",
    "GET /result/{job_id}",
    "DELETE /cache/{job_id}",
];
