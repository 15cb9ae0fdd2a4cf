//! Request types supplied by the upload boundary.
//!
//! A [`ConversionRequest`] is created by the caller and never mutated by the
//! pipeline. Wire names are camelCase so the boundary can deserialise the
//! JSON body it already receives and hand it over untouched.

use serde::{Deserialize, Serialize};

/// One conversion request: which staged file, how, and with what overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    /// Name of the file relative to the staging root.
    pub target_name: String,

    #[serde(default)]
    pub options: ConvertOptions,

    #[serde(default)]
    pub metadata: DocumentOverrides,
}

impl ConversionRequest {
    pub fn new(target_name: impl Into<String>) -> Self {
        Self {
            target_name: target_name.into(),
            ..Default::default()
        }
    }

    /// Preview mode: documents are returned but not written to the store.
    pub fn parse_only(mut self, v: bool) -> Self {
        self.options.parse_only = v;
        self
    }

    pub fn metadata(mut self, metadata: DocumentOverrides) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Per-request switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// `true` = preview mode, `false` = persist mode.
    #[serde(default)]
    pub parse_only: bool,
}

/// Caller-supplied values that take precedence over converter defaults.
///
/// Only presence is checked; an empty string counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOverrides {
    pub title: Option<String>,
    pub doc_author: Option<String>,
    pub description: Option<String>,
    pub doc_source: Option<String>,
    pub chunk_source: Option<String>,
}

impl DocumentOverrides {
    pub fn title_or(&self, default: impl Into<String>) -> String {
        pick(&self.title, default)
    }

    pub fn doc_author_or(&self, default: impl Into<String>) -> String {
        pick(&self.doc_author, default)
    }

    pub fn description_or(&self, default: impl Into<String>) -> String {
        pick(&self.description, default)
    }

    pub fn doc_source_or(&self, default: impl Into<String>) -> String {
        pick(&self.doc_source, default)
    }

    pub fn chunk_source_or(&self, default: impl Into<String>) -> String {
        pick(&self.chunk_source, default)
    }
}

fn pick(value: &Option<String>, default: impl Into<String>) -> String {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.into(),
    }
}
