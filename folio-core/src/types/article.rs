//! Article types.
//!
//! Articles come from the backend as loosely-typed JSON: optional fields may
//! be missing or null, and `published_at` is not always a strict RFC 3339
//! timestamp. Deserialization is tolerant of both.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::DEFAULT_ARTICLE_IMAGE;
use crate::error::{FolioError, Result};

/// A published article.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Backend-assigned identifier
    pub id: String,
    /// Title
    pub title: String,
    /// Markdown body
    #[serde(default)]
    pub content: String,
    /// Optional short summary shown in lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Cover image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Free-form tags
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    /// Publication time, if the backend sent a parseable one
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<DateTime<Utc>>,
    /// Owner of the article
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Display name of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Editorial category ("NEWS", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Article {
    /// Text shown under the title in result lists.
    ///
    /// Uses the preview when present, the body otherwise, cut to
    /// `max_chars` characters with a trailing `...`.
    pub fn preview_text(&self, max_chars: usize) -> String {
        let source = self
            .preview
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.content);
        truncate_chars(source, max_chars)
    }

    /// Case-insensitive match against title, body and tags.
    ///
    /// `keyword` must already be lowercased.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        self.title.to_lowercase().contains(keyword)
            || self.content.to_lowercase().contains(keyword)
            || self.tags.iter().any(|t| t.to_lowercase().contains(keyword))
    }

    /// Publication date as `YYYY-MM-DD`, empty when unknown.
    pub fn formatted_date(&self) -> String {
        self.published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    /// Whether `user_id` owns this article.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }

    /// Cover image, or the site-wide placeholder.
    pub fn cover_image(&self) -> &str {
        self.image_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_ARTICLE_IMAGE)
    }
}

/// Cuts `text` to at most `max_chars` characters, appending `...` when cut.
///
/// Counts characters, not bytes, so CJK text is never split mid-codepoint.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// An article about to be created or updated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleDraft {
    /// Title
    pub title: String,
    /// Markdown body
    pub content: String,
    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Cover image URL; empty when there is none
    #[serde(default)]
    pub image_url: String,
    /// Author's user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl ArticleDraft {
    /// Creates a draft with a title and body.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Adds tags, dropping blanks and duplicates.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into().trim().to_string();
            if !tag.is_empty() && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self
    }

    /// Sets the cover image.
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = url.into();
        self
    }

    /// Trims title and body and rejects a draft missing either.
    pub fn validate(mut self) -> Result<Self> {
        self.title = self.title.trim().to_string();
        self.content = self.content.trim().to_string();
        if self.title.is_empty() || self.content.is_empty() {
            return Err(FolioError::ValidationError(
                "title and content are required".into(),
            ));
        }
        Ok(self)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sample() -> Article {
        serde_json::from_value(serde_json::json!({
            "id": "a1",
            "title": "最新美容趨勢分析",
            "content": "隨著科技的進步，美容行業不斷創新",
            "tags": ["NEWS", "Skincare"],
            "published_at": "2024-11-02T08:30:00Z",
            "user_id": "u1"
        }))
        .unwrap()
    }

    #[test]
    fn test_cover_image_falls_back() {
        let mut article = sample();
        assert_eq!(article.cover_image(), DEFAULT_ARTICLE_IMAGE);
        article.image_url = Some("https://cdn/a1.png".into());
        assert_eq!(article.cover_image(), "https://cdn/a1.png");
    }

    #[test]
    fn test_minimal_article_deserializes() {
        let article: Article =
            serde_json::from_str(r#"{"id":"a1","title":"t","tags":null}"#).unwrap();
        assert!(article.tags.is_empty());
        assert!(article.content.is_empty());
        assert!(article.published_at.is_none());
    }

    #[test_case("2024-11-02T08:30:00Z" ; "rfc3339")]
    #[test_case("2024-11-02T08:30:00.123456" ; "naive with fraction")]
    #[test_case("Sat, 02 Nov 2024 08:30:00 GMT" ; "rfc2822")]
    fn test_timestamp_formats(raw: &str) {
        let article: Article = serde_json::from_value(serde_json::json!({
            "id": "a1", "title": "t", "published_at": raw
        }))
        .unwrap();
        assert_eq!(article.formatted_date(), "2024-11-02");
    }

    #[test]
    fn test_unparseable_timestamp_is_dropped() {
        let article: Article = serde_json::from_value(serde_json::json!({
            "id": "a1", "title": "t", "published_at": "yesterday"
        }))
        .unwrap();
        assert!(article.published_at.is_none());
        assert_eq!(article.formatted_date(), "");
    }

    #[test]
    fn test_matches_keyword() {
        let article = sample();
        assert!(article.matches_keyword("美容"));
        assert!(article.matches_keyword("skincare"));
        assert!(!article.matches_keyword("travel"));
    }

    #[test]
    fn test_preview_prefers_summary() {
        let mut article = sample();
        assert_eq!(article.preview_text(4), "隨著科技...");
        article.preview = Some("短摘要".into());
        assert_eq!(article.preview_text(100), "短摘要");
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("日常護膚的重要性", 4), "日常護膚...");
    }

    #[test]
    fn test_ownership() {
        let article = sample();
        assert!(article.is_owned_by("u1"));
        assert!(!article.is_owned_by("u2"));
    }

    #[test]
    fn test_draft_validation() {
        assert!(ArticleDraft::new("  ", "body").validate().is_err());
        assert!(ArticleDraft::new("title", "").validate().is_err());

        let draft = ArticleDraft::new(" title ", " body ").validate().unwrap();
        assert_eq!(draft.title, "title");
        assert_eq!(draft.content, "body");
    }

    #[test]
    fn test_draft_tags_deduplicated() {
        let draft = ArticleDraft::new("t", "c").with_tags(["a", " a ", "", "b"]);
        assert_eq!(draft.tags, vec!["a".to_string(), "b".to_string()]);
    }
}
