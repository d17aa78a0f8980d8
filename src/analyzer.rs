//! Scoring and ranking of search hits.
//!
//! Every hit gets three partial scores in `[0, 1]`:
//!
//! - **relevance**: query terms found in the title (2.0 each) and in the
//!   content (1.0 each), normalised by `num_terms * 3` and capped at 1.0
//! - **freshness**: a neutral 0.5 for every hit; `publishedDate` is carried
//!   on [`SearchHit`] but not scored yet
//! - **authority**: 0.8 when the URL host contains a known high-authority
//!   domain, 0.5 otherwise
//!
//! The composite is the caller-weighted sum of the three. Results are ranked
//! by composite, highest first, with ties kept in input order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data_models::SearchHit;
use crate::error::ToolError;

/// Ranked results kept in a report. Insights still cover every hit.
pub const RANKED_RESULT_CAP: usize = 10;

pub const NEUTRAL_FRESHNESS: f64 = 0.5;
pub const NEUTRAL_AUTHORITY: f64 = 0.5;
pub const HIGH_AUTHORITY: f64 = 0.8;

/// Hosts matched by substring against a hit's domain.
pub const AUTHORITY_DOMAINS: [&str; 4] = [
    "wikipedia.org",
    "github.com",
    "stackoverflow.com",
    "arxiv.org",
];

const TITLE_MATCH: f64 = 2.0;
const CONTENT_MATCH: f64 = 1.0;
const MAX_PER_TERM: f64 = TITLE_MATCH + CONTENT_MATCH;

pub const NO_RESULTS_MESSAGE: &str = "No results to analyze";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub relevance: f64,
    pub freshness: f64,
    pub authority: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            relevance: 0.5,
            freshness: 0.3,
            authority: 0.2,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub relevance: f64,
    pub freshness: f64,
    pub authority: f64,
    pub composite: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub title: String,
    pub url: String,
    pub scores: Scores,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnalysisInsights {
    pub total_results_analyzed: usize,
    pub average_relevance: f64,
    pub top_result: Option<String>,
    pub top_result_url: Option<String>,
    pub top_result_score: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Analysis {
    pub insights: AnalysisInsights,
    pub scoring_weights: ScoringWeights,
    pub ranked_results: Vec<ScoredResult>,
}

/// Outcome of a successful analysis call.
///
/// An empty hit list is a success, not an error, and serializes as
/// `{query, analysis: "No results to analyze", total_results: 0}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AnalysisReport {
    Ranked {
        query: String,
        analysis: Analysis,
    },
    Empty {
        query: String,
        analysis: String,
        total_results: usize,
    },
}

impl AnalysisReport {
    fn empty(query: &str) -> AnalysisReport {
        AnalysisReport::Empty {
            query: query.to_string(),
            analysis: NO_RESULTS_MESSAGE.to_string(),
            total_results: 0,
        }
    }

    pub fn query(&self) -> &str {
        match self {
            Self::Ranked { query, .. } | Self::Empty { query, .. } => query,
        }
    }

    pub fn total_results_analyzed(&self) -> usize {
        match self {
            Self::Ranked { analysis, .. } => analysis.insights.total_results_analyzed,
            Self::Empty { .. } => 0,
        }
    }
}

/// Rounds to three decimal places.
///
/// Rounds the exact binary value, with exact ties going to even, so
/// `1.0005` (stored just below the tie) becomes `1.0`.
pub fn round3(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.3}").parse().unwrap_or(value)
}

fn query_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Relevance of one hit against pre-lowercased query terms.
pub fn relevance_score(terms: &[String], title: &str, content: &str) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let title = title.to_lowercase();
    let content = content.to_lowercase();

    let mut tally = 0.0;
    for term in terms {
        if title.contains(term.as_str()) {
            tally += TITLE_MATCH;
        }
        if content.contains(term.as_str()) {
            tally += CONTENT_MATCH;
        }
    }
    (tally / (terms.len() as f64 * MAX_PER_TERM)).min(1.0)
}

pub fn freshness_score(_hit: &SearchHit) -> f64 {
    NEUTRAL_FRESHNESS
}

/// Host portion of `scheme://host/...`: the third `/`-separated segment.
pub fn domain_of(url: &str) -> &str {
    url.split('/').nth(2).unwrap_or("")
}

pub fn authority_score(url: &str) -> f64 {
    let domain = domain_of(url);
    if !domain.is_empty() && AUTHORITY_DOMAINS.iter().any(|known| domain.contains(known)) {
        HIGH_AUTHORITY
    } else {
        NEUTRAL_AUTHORITY
    }
}

fn score_hit(terms: &[String], hit: &SearchHit, weights: &ScoringWeights) -> ScoredResult {
    let relevance = relevance_score(terms, &hit.title, &hit.content);
    let freshness = freshness_score(hit);
    let authority = authority_score(&hit.url);
    let composite = relevance * weights.relevance
        + freshness * weights.freshness
        + authority * weights.authority;

    ScoredResult {
        title: hit.title.clone(),
        url: hit.url.clone(),
        scores: Scores {
            relevance: round3(relevance),
            freshness: round3(freshness),
            authority: round3(authority),
            composite: round3(composite),
        },
    }
}

/// Scores, ranks and summarises `hits` for `query`.
pub fn analyze(
    query: &str,
    hits: &[SearchHit],
    weights: ScoringWeights,
) -> Result<AnalysisReport, ToolError> {
    if hits.is_empty() {
        return Ok(AnalysisReport::empty(query));
    }

    let terms = query_terms(query);
    let mut scored: Vec<ScoredResult> = hits
        .iter()
        .map(|hit| score_hit(&terms, hit, &weights))
        .collect();

    if let Some(bad) = scored.iter().find(|r| !r.scores.composite.is_finite()) {
        return Err(ToolError::AnalysisFailed {
            query: query.to_string(),
            details: format!(
                "non-finite composite score for {:?} with weights {:?}",
                bad.url, weights
            ),
        });
    }

    // stable: equal composites keep input order
    scored.sort_by(|a, b| b.scores.composite.total_cmp(&a.scores.composite));

    let total = scored.len();
    let relevance_sum: f64 = scored.iter().map(|r| r.scores.relevance).sum();
    let top = &scored[0];
    let insights = AnalysisInsights {
        total_results_analyzed: total,
        average_relevance: round3(relevance_sum / total as f64),
        top_result: Some(top.title.clone()),
        top_result_url: Some(top.url.clone()),
        top_result_score: Some(top.scores.composite),
    };

    scored.truncate(RANKED_RESULT_CAP);

    Ok(AnalysisReport::Ranked {
        query: query.to_string(),
        analysis: Analysis {
            insights,
            scoring_weights: weights,
            ranked_results: scored,
        },
    })
}

/// Parses serialized hits: either a JSON array of hit objects or an object
/// carrying them under `results`. A missing `results` field means no hits.
pub fn parse_hits(query: &str, results: &str) -> Result<Vec<SearchHit>, ToolError> {
    let value: Value = serde_json::from_str(results).map_err(|e| ToolError::MalformedInput {
        query: query.to_string(),
        details: e.to_string(),
    })?;
    hits_from_value(query, value)
}

/// Same shapes as [`parse_hits`], for results that arrive already decoded.
pub fn hits_from_value(query: &str, value: Value) -> Result<Vec<SearchHit>, ToolError> {
    let malformed = |details: String| ToolError::MalformedInput {
        query: query.to_string(),
        details,
    };

    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(malformed(format!(
                    "results field must be a list, got {}",
                    json_type_name(&other)
                )));
            }
        },
        other => {
            return Err(malformed(format!(
                "expected a list of results or an object with a results field, got {}",
                json_type_name(&other)
            )));
        }
    };

    list.into_iter()
        .enumerate()
        .map(|(idx, item)| {
            serde_json::from_value::<SearchHit>(item)
                .map_err(|e| malformed(format!("result {idx}: {e}")))
        })
        .collect()
}

/// [`parse_hits`] followed by [`analyze`].
pub fn analyze_serialized(
    query: &str,
    results: &str,
    weights: ScoringWeights,
) -> Result<AnalysisReport, ToolError> {
    let hits = parse_hits(query, results)?;
    analyze(query, &hits, weights)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(q: &str) -> Vec<String> {
        query_terms(q)
    }

    #[test]
    fn relevance_counts_title_and_content_independently() {
        assert_eq!(relevance_score(&terms("cat"), "Cat facts", "all about cats"), 1.0);
        assert_eq!(relevance_score(&terms("cat"), "Cat facts", "dogs"), 2.0 / 3.0);
        assert_eq!(relevance_score(&terms("cat"), "Dogs", "cats"), 1.0 / 3.0);
        assert_eq!(relevance_score(&terms("cat"), "Dogs", "dogs"), 0.0);
    }

    #[test]
    fn relevance_with_no_terms_is_zero() {
        assert_eq!(relevance_score(&terms(""), "anything", "anything"), 0.0);
        assert_eq!(relevance_score(&terms("   \t "), "anything", "anything"), 0.0);
    }

    #[test]
    fn relevance_partial_multi_term() {
        // "rust" in title and content (3), "async" in content only (1) -> 4/6
        let score = relevance_score(&terms("Rust async"), "Rust book", "rust and async");
        assert!((score - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn domain_is_third_slash_segment() {
        assert_eq!(domain_of("https://en.wikipedia.org/wiki/Cat"), "en.wikipedia.org");
        assert_eq!(domain_of("https://github.com"), "github.com");
        assert_eq!(domain_of("github.com/rust-lang"), "");
        assert_eq!(domain_of(""), "");
    }

    #[test]
    fn authority_allow_list() {
        assert_eq!(authority_score("https://en.wikipedia.org/wiki/Cat"), HIGH_AUTHORITY);
        assert_eq!(authority_score("https://arxiv.org/abs/1234"), HIGH_AUTHORITY);
        assert_eq!(authority_score("https://example.com/github.com"), NEUTRAL_AUTHORITY);
        assert_eq!(authority_score(""), NEUTRAL_AUTHORITY);
    }

    #[test]
    fn round3_rounds_exact_decimal_value() {
        assert_eq!(round3(0.81000000000001), 0.81);
        assert_eq!(round3(2.0 / 3.0), 0.667);
        assert_eq!(round3(0.0), 0.0);
        assert_eq!(round3(1.0005), 1.0);
        assert_eq!(round3(0.5625), 0.562);
        assert_eq!(round3(-0.0625), -0.062);
        assert!(round3(f64::NAN).is_nan());
    }

    #[test]
    fn non_finite_weights_fail_analysis() {
        let hits = vec![SearchHit {
            title: "t".into(),
            url: "https://example.com".into(),
            ..Default::default()
        }];
        let weights = ScoringWeights {
            relevance: f64::NAN,
            ..Default::default()
        };
        let err = analyze("q", &hits, weights).unwrap_err();
        assert!(matches!(err, ToolError::AnalysisFailed { ref query, .. } if query == "q"));
    }

    #[test]
    fn parse_hits_accepts_list_and_object() {
        let list = parse_hits("q", r#"[{"title": "a", "url": "https://a.com"}]"#).unwrap();
        assert_eq!(list.len(), 1);

        let object =
            parse_hits("q", r#"{"query": "q", "results": [{"title": "a"}, {"title": "b"}]}"#)
                .unwrap();
        assert_eq!(object.len(), 2);

        let missing = parse_hits("q", r#"{"query": "q"}"#).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn parse_hits_rejects_non_records() {
        assert!(matches!(
            parse_hits("q", "not json"),
            Err(ToolError::MalformedInput { .. })
        ));
        assert!(matches!(
            parse_hits("q", "42"),
            Err(ToolError::MalformedInput { .. })
        ));
        assert!(matches!(
            parse_hits("q", r#"{"results": "nope"}"#),
            Err(ToolError::MalformedInput { .. })
        ));
        assert!(matches!(
            parse_hits("q", r#"["just a string"]"#),
            Err(ToolError::MalformedInput { .. })
        ));
    }
}
