//! Output types: the canonical document record and the dispatcher result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The normalised unit of extracted text plus metadata, ready for indexing.
///
/// Field names on the wire match what the indexing layer already reads,
/// including the snake-case `token_count_estimate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalDocument {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub doc_author: String,
    pub description: String,
    pub doc_source: String,
    pub chunk_source: String,
    pub published: DateTime<Utc>,
    pub word_count: usize,
    pub page_content: String,
    #[serde(rename = "token_count_estimate", alias = "tokenCountEstimate")]
    pub token_count_estimate: usize,

    /// Store-relative location (`<folder>/<file>.json`) once persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Terminal output of [`crate::Collector::convert`].
///
/// `reason` is set only when `success` is false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub success: bool,
    pub reason: Option<String>,
    pub documents: Vec<CanonicalDocument>,
}

impl ConversionResult {
    pub fn ok(documents: Vec<CanonicalDocument>) -> Self {
        Self {
            success: true,
            reason: None,
            documents,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
            documents: Vec::new(),
        }
    }
}

/// Whitespace-delimited word count; empty tokens are not counted.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CanonicalDocument {
        CanonicalDocument {
            id: Uuid::new_v4(),
            url: "file:///tmp/a.txt".into(),
            title: "a.txt".into(),
            doc_author: "Unknown".into(),
            description: "Unknown".into(),
            doc_source: "a text file uploaded by the user.".into(),
            chunk_source: String::new(),
            published: Utc::now(),
            word_count: 2,
            page_content: "hello world".into(),
            token_count_estimate: 2,
            location: None,
        }
    }

    #[test]
    fn wire_names() {
        let v = serde_json::to_value(sample()).unwrap();
        for key in [
            "id",
            "url",
            "title",
            "docAuthor",
            "description",
            "docSource",
            "chunkSource",
            "published",
            "wordCount",
            "pageContent",
            "token_count_estimate",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert!(v.get("location").is_none());
    }

    #[test]
    fn word_count_ignores_runs_of_whitespace() {
        assert_eq!(word_count("  one\ttwo\n\nthree  "), 3);
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count(" \n\t "), 0);
    }

    #[test]
    fn failed_result_has_reason_and_no_documents() {
        let r = ConversionResult::failed("nope");
        assert!(!r.success);
        assert_eq!(r.reason.as_deref(), Some("nope"));
        assert!(r.documents.is_empty());
        assert!(ConversionResult::ok(vec![sample()]).reason.is_none());
    }
}
