//! Error taxonomy shared by the clients, the analyzer and the tool surface.
//!
//! Every variant renders into an [`ErrorPayload`], the structured object
//! callers receive instead of a success body. Raw internal fault text never
//! leaves the process except through the `details` field.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    /// The serialized search results could not be parsed into hit records.
    #[error("invalid JSON in results parameter")]
    MalformedInput { query: String, details: String },

    /// A backend was unreachable, timed out, or answered with a non-success status.
    #[error("{context}: {details}")]
    Transport { context: String, details: String },

    /// Scoring failed for a reason other than malformed input.
    #[error("analysis failed: {details}")]
    AnalysisFailed { query: String, details: String },

    /// A cached artifact is absent or expired.
    #[error("not found: {0}")]
    NotFound(String),

    /// The cache store is disabled or unreachable.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// A request parameter failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Wire shape of every externally visible failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl ToolError {
    pub fn transport(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Transport {
            context: context.into(),
            details: details.into(),
        }
    }

    /// Re-labels a transport failure with the caller's operation name.
    /// Other variants pass through untouched.
    pub fn with_context(self, context: &str) -> Self {
        match self {
            Self::Transport { details, .. } => Self::transport(context, details),
            other => other,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "malformed_input",
            Self::Transport { .. } => "transport_error",
            Self::AnalysisFailed { .. } => "analysis_failed",
            Self::NotFound(_) => "not_found",
            Self::CacheUnavailable(_) => "cache_unavailable",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedInput { .. } | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Transport { .. } => StatusCode::BAD_GATEWAY,
            Self::AnalysisFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::CacheUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        let kind = self.kind().to_string();
        match self {
            Self::MalformedInput { query, .. } => ErrorPayload {
                kind,
                error: "Invalid JSON in results parameter".to_string(),
                details: None,
                query: Some(query.clone()),
            },
            Self::Transport { context, details } => ErrorPayload {
                kind,
                error: context.clone(),
                details: Some(details.clone()),
                query: None,
            },
            Self::AnalysisFailed { query, details } => ErrorPayload {
                kind,
                error: "Analysis failed".to_string(),
                details: Some(details.clone()),
                query: Some(query.clone()),
            },
            Self::NotFound(what) => ErrorPayload {
                kind,
                error: "Result not found or expired".to_string(),
                details: Some(what.clone()),
                query: None,
            },
            Self::CacheUnavailable(reason) => ErrorPayload {
                kind,
                error: "Cache service unavailable".to_string(),
                details: Some(reason.clone()),
                query: None,
            },
            Self::InvalidRequest(reason) => ErrorPayload {
                kind,
                error: "Invalid request".to_string(),
                details: Some(reason.clone()),
                query: None,
            },
        }
    }
}

/// One-line description of a failed backend request.
pub(crate) fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("backend unreachable: {err}")
    } else {
        err.to_string()
    }
}

impl IntoResponse for ToolError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.payload())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_echoes_query_without_details() {
        let err = ToolError::MalformedInput {
            query: "rust".into(),
            details: "expected value at line 1 column 1".into(),
        };
        let payload = err.payload();
        assert_eq!(payload.kind, "malformed_input");
        assert_eq!(payload.error, "Invalid JSON in results parameter");
        assert_eq!(payload.query.as_deref(), Some("rust"));
        assert!(payload.details.is_none());
    }

    #[test]
    fn with_context_relabels_transport_only() {
        let err = ToolError::transport("Crawl failed", "connection refused")
            .with_context("Failed to crawl URL for extraction");
        assert_eq!(
            err.to_string(),
            "Failed to crawl URL for extraction: connection refused"
        );

        let not_found = ToolError::NotFound("abc".into()).with_context("ignored");
        assert_eq!(not_found, ToolError::NotFound("abc".into()));
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ToolError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ToolError::CacheUnavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ToolError::transport("Search failed", "timeout").status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn payload_skips_absent_fields() {
        let json = serde_json::to_value(ToolError::transport("Search failed", "timeout").payload())
            .unwrap();
        assert_eq!(json["error"], "Search failed");
        assert_eq!(json["details"], "timeout");
        assert!(json.get("query").is_none());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ToolError>();
    }
}
