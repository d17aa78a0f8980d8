use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::data_models::SearchHit;
use crate::error::{ToolError, describe};

const SEARCH_FAILED: &str = "Search failed";

/// Budget for the `/healthz` reachability check.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Query sent to the search aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    /// Comma-separated engine names; all configured engines when `None`.
    pub engines: Option<String>,
    pub categories: String,
    pub language: String,
    pub page: u32,
    pub safe_search: u8,
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// Decodes each hit on its own; a hit with a wrongly typed field is dropped.
fn decode_hits(raw: Vec<Value>) -> Vec<SearchHit> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<SearchHit>(item) {
            Ok(hit) => Some(hit),
            Err(e) => {
                tracing::warn!(index = idx, error = %e, "skipping undecodable search hit");
                None
            }
        })
        .collect()
}

/// Client for a SearXNG-compatible `/search` endpoint.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl SearchClient {
    pub fn new(http: reqwest::Client, base_url: &str, timeout: Duration) -> SearchClient {
        SearchClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Whether the backend answers `GET /healthz` with 200.
    pub async fn is_reachable(&self) -> bool {
        match self
            .http
            .get(format!("{}/healthz", self.base_url))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::debug!(error = %describe(&e), "search backend health check failed");
                false
            }
        }
    }

    /// Runs one query. All hits the backend returned are passed through;
    /// truncation is the caller's concern.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, ToolError> {
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.query.clone()),
            ("format", "json".to_string()),
            ("categories", query.categories.clone()),
            ("language", query.language.clone()),
            ("pageno", query.page.to_string()),
            ("safesearch", query.safe_search.to_string()),
        ];
        if let Some(engines) = &query.engines {
            params.push(("engines", engines.clone()));
        }

        tracing::debug!(backend = %self.base_url, "sending search request");

        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ToolError::transport(SEARCH_FAILED, describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::transport(
                SEARCH_FAILED,
                format!("search backend returned {status}: {}", body.trim()),
            ));
        }

        let parsed: RawSearchResponse = response.json().await.map_err(|e| {
            ToolError::transport(SEARCH_FAILED, format!("invalid search response: {e}"))
        })?;

        let hits = decode_hits(parsed.results);
        tracing::info!(hits = hits.len(), "search backend answered");
        Ok(hits)
    }
}
