use std::time::Duration;

use serde::Deserialize;

use crate::data_models::{CrawlRequest, CrawlResult};
use crate::error::{ToolError, describe};

const CRAWL_FAILED: &str = "Crawl failed";

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct BackendError {
    detail: serde_json::Value,
}

/// Client for a Crawl4AI-compatible `/crawl` endpoint.
#[derive(Debug, Clone)]
pub struct CrawlClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CrawlClient {
    pub fn new(http: reqwest::Client, base_url: &str, timeout: Duration) -> CrawlClient {
        CrawlClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Whether the backend answers `GET /health` with 200.
    pub async fn is_reachable(&self) -> bool {
        match self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::debug!(error = %describe(&e), "crawl backend health check failed");
                false
            }
        }
    }

    /// Crawls one URL. The HTTP timeout is the larger of the configured
    /// client timeout and the per-request crawl timeout.
    pub async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlResult, ToolError> {
        let timeout = self
            .timeout
            .max(Duration::from_secs(request.options.timeout));

        tracing::info!(url = %request.url, "crawling url");

        let response = self
            .http
            .post(format!("{}/crawl", self.base_url))
            .json(request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ToolError::transport(CRAWL_FAILED, describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::transport(
                CRAWL_FAILED,
                format!("crawl backend returned {status}: {}", error_detail(&body)),
            ));
        }

        let mut result: CrawlResult = response.json().await.map_err(|e| {
            ToolError::transport(CRAWL_FAILED, format!("invalid crawl response: {e}"))
        })?;
        if result.url.is_empty() {
            result.url = request.url.clone();
        }
        Ok(result)
    }
}

/// FastAPI-style `{"detail": ...}` bodies yield their detail; anything else is passed through.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<BackendError>(body) {
        Ok(BackendError {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(BackendError { detail }) => detail.to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_prefers_detail_field() {
        assert_eq!(
            error_detail(r#"{"detail": "Crawl failed: net::ERR_NAME_NOT_RESOLVED"}"#),
            "Crawl failed: net::ERR_NAME_NOT_RESOLVED"
        );
        assert_eq!(error_detail("  upstream exploded \n"), "upstream exploded");
        assert_eq!(
            error_detail(r#"{"detail": [{"loc": ["body", "url"]}]}"#),
            r#"[{"loc":["body","url"]}]"#
        );
    }
}
