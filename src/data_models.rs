use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ToolError;

/// Content snippet length in search results, in characters.
pub const SNIPPET_CHARS: usize = 300;
/// Markdown preview length in crawl summaries, in characters.
pub const MARKDOWN_PREVIEW_CHARS: usize = 1000;
/// Links kept in a crawl summary.
pub const SUMMARY_LINK_CAP: usize = 20;
/// Images kept in a crawl summary.
pub const SUMMARY_IMAGE_CAP: usize = 10;
/// Videos kept in a crawl summary.
pub const SUMMARY_VIDEO_CAP: usize = 10;
/// Upper bound on `max_results` for a search.
pub const MAX_SEARCH_RESULTS: usize = 20;
/// Upper bound on URLs in one batch crawl.
pub const MAX_BATCH_URLS: usize = 50;

/// Treats an explicit JSON `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Keeps the first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// One raw result from the search backend.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SearchHit {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub engine: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: f64,
    #[serde(rename = "publishedDate", default)]
    pub published_date: Option<String>,
}

impl SearchHit {
    /// Copy of this hit with its content cut to the snippet length.
    pub fn snippet(&self) -> SearchHit {
        SearchHit {
            content: truncate_chars(&self.content, SNIPPET_CHARS),
            ..self.clone()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStrategy {
    #[default]
    Auto,
    Llm,
    Cosine,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Llm => "llm",
            Self::Cosine => "cosine",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    Regex,
    #[default]
    Markdown,
    Sliding,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regex => "regex",
            Self::Markdown => "markdown",
            Self::Sliding => "sliding",
        }
    }
}

fn default_word_count_threshold() -> u32 {
    10
}

fn default_crawl_timeout() -> u64 {
    30
}

/// Knobs forwarded to the crawl backend alongside the URL.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CrawlOptions {
    #[serde(default)]
    pub extraction_strategy: ExtractionStrategy,
    #[serde(default)]
    pub chunking_strategy: ChunkingStrategy,
    #[serde(default)]
    pub screenshot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_selector: Option<String>,
    #[serde(default = "default_word_count_threshold")]
    pub word_count_threshold: u32,
    /// Seconds.
    #[serde(default = "default_crawl_timeout")]
    pub timeout: u64,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            extraction_strategy: ExtractionStrategy::default(),
            chunking_strategy: ChunkingStrategy::default(),
            screenshot: false,
            wait_for: None,
            js_code: None,
            css_selector: None,
            word_count_threshold: default_word_count_threshold(),
            timeout: default_crawl_timeout(),
        }
    }
}

impl CrawlOptions {
    pub fn validate(&self) -> Result<(), ToolError> {
        if !(5..=120).contains(&self.timeout) {
            return Err(ToolError::InvalidRequest(
                "timeout must be between 5 and 120 seconds".into(),
            ));
        }
        if self.word_count_threshold == 0 {
            return Err(ToolError::InvalidRequest(
                "word_count_threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Body of `POST /crawl` on the crawl backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CrawlRequest {
    pub url: String,
    #[serde(flatten)]
    pub options: CrawlOptions,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>, options: CrawlOptions) -> CrawlRequest {
        CrawlRequest {
            url: url.into(),
            options,
        }
    }

    pub fn validate(&self) -> Result<(), ToolError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ToolError::InvalidRequest(format!(
                "url must be an http or https URL, got {:?}",
                self.url
            )));
        }
        self.options.validate()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Media {
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub videos: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
}

/// Canonical crawl result, as produced by the crawl backend and stored in the cache.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CrawlResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub markdown: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub html: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub media: Media,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: PageMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

/// Shaped view of a crawl returned by the `web_crawl` tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CrawlSummary {
    pub url: String,
    pub title: String,
    pub description: String,
    pub content_length: usize,
    pub links_found: usize,
    pub images_found: usize,
    pub videos_found: usize,
    pub markdown_preview: String,
    pub full_markdown: String,
    pub links: Vec<String>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl CrawlSummary {
    pub fn from_result(requested_url: &str, result: &CrawlResult) -> CrawlSummary {
        let url = if result.url.is_empty() {
            requested_url.to_string()
        } else {
            result.url.clone()
        };
        CrawlSummary {
            url,
            title: result.metadata.title.clone(),
            description: result.metadata.description.clone(),
            content_length: result.markdown.chars().count(),
            links_found: result.links.len(),
            images_found: result.media.images.len(),
            videos_found: result.media.videos.len(),
            markdown_preview: truncate_chars(&result.markdown, MARKDOWN_PREVIEW_CHARS),
            full_markdown: result.markdown.clone(),
            links: result.links.iter().take(SUMMARY_LINK_CAP).cloned().collect(),
            images: result
                .media
                .images
                .iter()
                .take(SUMMARY_IMAGE_CAP)
                .cloned()
                .collect(),
            videos: result
                .media
                .videos
                .iter()
                .take(SUMMARY_VIDEO_CAP)
                .cloned()
                .collect(),
            screenshot: result.screenshot.clone().filter(|s| !s.is_empty()),
        }
    }
}
