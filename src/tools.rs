//! Request façade: the operations exposed to callers, with caching and shaping.
//!
//! [`Toolbox`] owns the search and crawl clients and the cache, all injected
//! at construction. Each operation checks the cache, falls through to the
//! backend on a miss, stores the fresh result, and shapes the response.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analyzer::{self, AnalysisReport, ScoringWeights};
use crate::cache::{
    Cache, RedisStore, SearchKeyParts, TtlPolicy, crawl_job_id, crawl_key, crawl_key_for_job,
    search_key,
};
use crate::config::{CacheBackend, Config};
use crate::crawl_client::CrawlClient;
use crate::data_models::{
    ChunkingStrategy, CrawlOptions, CrawlRequest, CrawlResult, CrawlSummary, ExtractionStrategy,
    MAX_BATCH_URLS, MAX_SEARCH_RESULTS, SearchHit,
};
use crate::error::ToolError;
use crate::extractor::{self, ContentType, Extraction};
use crate::search_client::{SearchClient, SearchQuery};

pub const SERVICE_NAME: &str = "sieve";

pub const TOOL_NAMES: [&str; 4] = [
    "web_search",
    "web_crawl",
    "extract_content",
    "analyze_search_results",
];

const EXTRACT_FAILED: &str = "Failed to crawl URL for extraction";

fn default_page() -> u32 {
    1
}

fn default_max_results() -> usize {
    10
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: String,
    /// Comma-separated engine names.
    #[serde(default)]
    pub engines: Option<String>,
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    /// 0 = off, 1 = moderate, 2 = strict.
    #[serde(default)]
    pub safe_search: u8,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> SearchParams {
        SearchParams {
            query: query.into(),
            engines: None,
            categories: None,
            language: None,
            page: default_page(),
            safe_search: 0,
            max_results: default_max_results(),
        }
    }

    /// Validates the parameters and returns the effective result limit.
    pub fn validate(&self) -> Result<usize, ToolError> {
        if self.query.trim().is_empty() {
            return Err(ToolError::InvalidRequest("query cannot be empty".into()));
        }
        if self.page == 0 {
            return Err(ToolError::InvalidRequest("page starts at 1".into()));
        }
        if self.safe_search > 2 {
            return Err(ToolError::InvalidRequest(
                "safe_search must be 0, 1 or 2".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(ToolError::InvalidRequest(
                "max_results must be greater than 0".into(),
            ));
        }
        Ok(self.max_results.min(MAX_SEARCH_RESULTS))
    }

    fn non_empty(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub query: String,
    /// Hits the backend returned before truncation.
    pub total_results: usize,
    pub engines_used: String,
    pub category: String,
    pub language: String,
    pub page: u32,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExtractParams {
    pub url: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub selector: Option<String>,
}

fn default_relevance_weight() -> f64 {
    ScoringWeights::default().relevance
}

fn default_freshness_weight() -> f64 {
    ScoringWeights::default().freshness
}

fn default_authority_weight() -> f64 {
    ScoringWeights::default().authority
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnalyzeParams {
    pub query: String,
    /// Either a JSON string holding the results, or the results inline.
    pub results: Value,
    #[serde(default = "default_relevance_weight")]
    pub relevance_weight: f64,
    #[serde(default = "default_freshness_weight")]
    pub freshness_weight: f64,
    #[serde(default = "default_authority_weight")]
    pub authority_weight: f64,
}

impl AnalyzeParams {
    pub fn weights(&self) -> ScoringWeights {
        ScoringWeights {
            relevance: self.relevance_weight,
            freshness: self.freshness_weight,
            authority: self.authority_weight,
        }
    }
}

fn default_batch_timeout() -> u64 {
    CrawlOptions::default().timeout
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchCrawlRequest {
    pub urls: Vec<String>,
    #[serde(default)]
    pub extraction_strategy: ExtractionStrategy,
    #[serde(default)]
    pub chunking_strategy: ChunkingStrategy,
    #[serde(default)]
    pub screenshot: bool,
    #[serde(default = "default_batch_timeout")]
    pub timeout: u64,
}

impl BatchCrawlRequest {
    fn options(&self) -> CrawlOptions {
        CrawlOptions {
            extraction_strategy: self.extraction_strategy,
            chunking_strategy: self.chunking_strategy,
            screenshot: self.screenshot,
            timeout: self.timeout,
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchJob {
    pub url: String,
    pub job_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchCrawlResponse {
    pub status: String,
    pub total_urls: usize,
    pub jobs: Vec<BatchJob>,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClearCacheResponse {
    pub status: String,
    pub job_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BackendHealth {
    pub searxng: bool,
    pub crawl4ai: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub status: String,
    pub service: String,
    pub cache_backend: String,
    pub cache_connected: bool,
    pub backends: BackendHealth,
    pub tools: Vec<String>,
    pub timestamp: String,
}

#[derive(Clone)]
pub struct Toolbox {
    search: SearchClient,
    crawl: CrawlClient,
    cache: Cache,
}

impl Toolbox {
    pub fn new(search: SearchClient, crawl: CrawlClient, cache: Cache) -> Toolbox {
        Toolbox {
            search,
            crawl,
            cache,
        }
    }

    /// Wires clients and cache from configuration. No network calls are made here.
    pub fn from_config(config: &Config) -> anyhow::Result<Toolbox> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sieve/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = match config.cache_backend {
            CacheBackend::Memory => Cache::in_memory(config.cache_ttl),
            CacheBackend::Redis => Cache::new(
                std::sync::Arc::new(RedisStore::open(&config.redis_url)?),
                config.cache_ttl,
            ),
            CacheBackend::Disabled => Cache::disabled(),
        };
        tracing::info!(backend = cache.backend(), "cache configured");

        Ok(Toolbox::new(
            SearchClient::new(http.clone(), &config.searxng_url, config.searxng_timeout),
            CrawlClient::new(http, &config.crawl4ai_url, config.crawl4ai_timeout),
            cache,
        ))
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    fn ttl(&self) -> TtlPolicy {
        self.cache.ttl()
    }

    /// Reads and decodes a cached value; undecodable entries count as misses.
    async fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.cache.lookup(key).await.hit()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn remember<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(serialized) => self.cache.store(key, serialized, ttl).await,
            Err(e) => tracing::warn!(key, error = %e, "could not serialize value for cache"),
        }
    }

    pub async fn web_search(&self, params: &SearchParams) -> Result<SearchResponse, ToolError> {
        let max_results = params.validate()?;
        let engines = SearchParams::non_empty(&params.engines);
        let categories = SearchParams::non_empty(&params.categories);
        let language = SearchParams::non_empty(&params.language);

        let key = search_key(SearchKeyParts {
            query: &params.query,
            engines,
            categories,
            language,
            page: params.page,
            max_results,
        });
        if let Some(hit) = self.cached::<SearchResponse>(&key).await {
            return Ok(hit);
        }

        let query = SearchQuery {
            query: params.query.clone(),
            engines: engines.map(str::to_string),
            categories: categories.unwrap_or("general").to_string(),
            language: language.unwrap_or("en").to_string(),
            page: params.page,
            safe_search: params.safe_search,
        };
        let hits = self.search.search(&query).await?;

        let response = SearchResponse {
            query: params.query.clone(),
            total_results: hits.len(),
            engines_used: engines.unwrap_or("all configured engines").to_string(),
            category: query.categories,
            language: query.language,
            page: params.page,
            results: hits.iter().take(max_results).map(SearchHit::snippet).collect(),
        };

        self.remember(&key, &response, self.ttl().search).await;
        Ok(response)
    }

    /// Full crawl result for `request`, served from the cache when present.
    pub async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlResult, ToolError> {
        request.validate()?;
        let key = crawl_key(request);
        if let Some(hit) = self.cached::<CrawlResult>(&key).await {
            return Ok(hit);
        }

        let result = self.crawl.crawl(request).await?;
        self.remember(&key, &result, self.ttl().crawl).await;
        Ok(result)
    }

    pub async fn web_crawl(&self, request: &CrawlRequest) -> Result<CrawlSummary, ToolError> {
        let result = self.crawl(request).await?;
        Ok(CrawlSummary::from_result(&request.url, &result))
    }

    pub async fn extract_content(&self, params: &ExtractParams) -> Result<Extraction, ToolError> {
        let request = CrawlRequest::new(params.url.clone(), CrawlOptions::default());
        let result = self
            .crawl(&request)
            .await
            .map_err(|e| e.with_context(EXTRACT_FAILED))?;
        Ok(extractor::extract(
            &params.url,
            &result,
            params.content_type,
            params.selector.as_deref(),
        ))
    }

    pub fn analyze_search_results(
        &self,
        params: &AnalyzeParams,
    ) -> Result<AnalysisReport, ToolError> {
        match &params.results {
            Value::String(serialized) => {
                analyzer::analyze_serialized(&params.query, serialized, params.weights())
            }
            inline => {
                let hits = analyzer::hits_from_value(&params.query, inline.clone())?;
                analyzer::analyze(&params.query, &hits, params.weights())
            }
        }
    }

    /// Starts one background crawl per URL and returns their job ids at once.
    pub fn batch_crawl(&self, request: &BatchCrawlRequest) -> Result<BatchCrawlResponse, ToolError> {
        if request.urls.is_empty() {
            return Err(ToolError::InvalidRequest("urls cannot be empty".into()));
        }
        if request.urls.len() > MAX_BATCH_URLS {
            return Err(ToolError::InvalidRequest(format!(
                "Maximum {MAX_BATCH_URLS} URLs allowed per batch"
            )));
        }

        let crawls: Vec<CrawlRequest> = request
            .urls
            .iter()
            .map(|url| CrawlRequest::new(url.clone(), request.options()))
            .collect();
        for crawl in &crawls {
            crawl.validate()?;
        }

        let mut jobs = Vec::with_capacity(crawls.len());
        for crawl in crawls {
            jobs.push(BatchJob {
                url: crawl.url.clone(),
                job_id: crawl_job_id(&crawl),
            });
            let toolbox = self.clone();
            tokio::spawn(async move {
                if let Err(e) = toolbox.crawl(&crawl).await {
                    tracing::warn!(url = %crawl.url, error = %e, "batch crawl failed");
                }
            });
        }

        Ok(BatchCrawlResponse {
            status: "processing".to_string(),
            total_urls: jobs.len(),
            jobs,
            message: "Batch crawl initiated. Use job_id to retrieve results from cache."
                .to_string(),
        })
    }

    pub async fn get_result(&self, job_id: &str) -> Result<CrawlResult, ToolError> {
        self.cached::<CrawlResult>(&crawl_key_for_job(job_id))
            .await
            .ok_or_else(|| ToolError::NotFound(job_id.to_string()))
    }

    pub async fn clear_cache(&self, job_id: &str) -> Result<ClearCacheResponse, ToolError> {
        let deleted = self.cache.delete(&crawl_key_for_job(job_id)).await?;
        Ok(ClearCacheResponse {
            status: if deleted { "success" } else { "not_found" }.to_string(),
            job_id: job_id.to_string(),
        })
    }

    /// Degraded when a configured cache store or either backend does not answer.
    pub async fn health(&self) -> HealthReport {
        let (cache, searxng, crawl4ai) = tokio::join!(
            self.cache.ping(),
            self.search.is_reachable(),
            self.crawl.is_reachable()
        );
        let (cache_ok, connected) = match cache {
            None => (true, false),
            Some(Ok(())) => (true, true),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "cache store did not answer ping");
                (false, false)
            }
        };
        if !searxng || !crawl4ai {
            tracing::warn!(searxng, crawl4ai, "backend health check failed");
        }
        let status = if cache_ok && searxng && crawl4ai {
            "healthy"
        } else {
            "degraded"
        };
        HealthReport {
            status: status.to_string(),
            service: SERVICE_NAME.to_string(),
            cache_backend: self.cache.backend().to_string(),
            cache_connected: connected,
            backends: BackendHealth { searxng, crawl4ai },
            tools: TOOL_NAMES.iter().map(|t| t.to_string()).collect(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
