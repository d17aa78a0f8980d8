//! Projection of a crawl result onto the fields a caller asked for.

use serde::{Deserialize, Serialize};

use crate::data_models::{CrawlResult, PageMetadata};

const SELECTOR_NOTE: &str =
    "Selector-based extraction requires additional parsing - returning full content";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Links,
    Images,
    Videos,
    Metadata,
    All,
}

impl ContentType {
    fn includes(self, field: ContentType) -> bool {
        self == ContentType::All || self == field
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub url: String,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub fn extract(
    url: &str,
    crawl: &CrawlResult,
    content_type: ContentType,
    selector: Option<&str>,
) -> Extraction {
    let mut out = Extraction {
        url: url.to_string(),
        content_type,
        ..Default::default()
    };

    if content_type.includes(ContentType::Text) {
        out.text_length = Some(crawl.markdown.chars().count());
        out.text = Some(crawl.markdown.clone());
    }
    if content_type.includes(ContentType::Links) {
        out.links_count = Some(crawl.links.len());
        out.links = Some(crawl.links.clone());
    }
    if content_type.includes(ContentType::Images) {
        out.images_count = Some(crawl.media.images.len());
        out.images = Some(crawl.media.images.clone());
    }
    if content_type.includes(ContentType::Videos) {
        out.videos_count = Some(crawl.media.videos.len());
        out.videos = Some(crawl.media.videos.clone());
    }
    if content_type.includes(ContentType::Metadata) {
        out.metadata = Some(crawl.metadata.clone());
    }

    if let Some(selector) = selector.filter(|s| !s.trim().is_empty()) {
        out.selector = Some(selector.to_string());
        out.note = Some(SELECTOR_NOTE.to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::Media;

    fn sample() -> CrawlResult {
        CrawlResult {
            url: "https://example.com".into(),
            markdown: "# Hello".into(),
            links: vec!["https://example.com/a".into(), "https://example.com/b".into()],
            media: Media {
                images: vec!["a.png".into()],
                videos: vec![],
            },
            metadata: PageMetadata {
                title: "Hello".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn text_only() {
        let out = extract("https://example.com", &sample(), ContentType::Text, None);
        assert_eq!(out.text.as_deref(), Some("# Hello"));
        assert_eq!(out.text_length, Some(7));
        assert!(out.links.is_none());
        assert!(out.metadata.is_none());
    }

    #[test]
    fn links_only() {
        let out = extract("https://example.com", &sample(), ContentType::Links, None);
        assert_eq!(out.links_count, Some(2));
        assert!(out.text.is_none());
        assert!(out.images.is_none());
    }

    #[test]
    fn all_includes_every_field() {
        let out = extract("https://example.com", &sample(), ContentType::All, None);
        assert!(out.text.is_some());
        assert_eq!(out.links_count, Some(2));
        assert_eq!(out.images_count, Some(1));
        assert_eq!(out.videos_count, Some(0));
        assert_eq!(out.metadata.map(|m| m.title).as_deref(), Some("Hello"));
    }

    #[test]
    fn selector_is_echoed_with_note() {
        let out = extract(
            "https://example.com",
            &sample(),
            ContentType::Metadata,
            Some("div.main"),
        );
        assert_eq!(out.selector.as_deref(), Some("div.main"));
        assert!(out.note.is_some());
    }

    #[test]
    fn unknown_content_type_does_not_parse() {
        assert!(serde_json::from_str::<ContentType>(r#""code""#).is_err());
        assert_eq!(
            serde_json::from_str::<ContentType>(r#""videos""#).unwrap(),
            ContentType::Videos
        );
    }

    #[test]
    fn serialized_projection_omits_unrequested_fields() {
        let out = extract("https://example.com", &sample(), ContentType::Images, None);
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["content_type"], "images");
        assert_eq!(json["images_count"], 1);
        assert!(json.get("text").is_none());
        assert!(json.get("note").is_none());
    }
}
