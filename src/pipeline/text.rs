//! Text/CSV converter: the whole file becomes one document.
//!
//! The file is read in one go, decoded as UTF-8 (invalid sequences are
//! replaced rather than rejected), counted and wrapped into a
//! [`CanonicalDocument`] whose `pageContent` is the raw text. Everything
//! runs on the blocking pool; the [`TransientSource`] moves into that task
//! and is deleted when it ends, whatever the outcome.

use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::output::{word_count, CanonicalDocument};
use crate::pipeline::cleanup::TransientSource;
use crate::pipeline::file_timestamp;
use crate::pipeline::writer::{slugify, write_document, WriteTarget};
use crate::progress::ConversionProgressCallback;
use crate::request::ConversionRequest;
use crate::tokens::estimate_tokens;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

const CSV_SOURCE: &str = "a CSV file uploaded by the user.";
const TEXT_SOURCE: &str = "a text file uploaded by the user.";

/// Convert a claimed text source into a single document.
pub async fn convert_text(
    source: TransientSource,
    request: &ConversionRequest,
    config: &CollectorConfig,
) -> Result<Vec<CanonicalDocument>, CollectorError> {
    let job = TextJob {
        name: request.target_name.clone(),
        metadata: request.metadata.clone(),
        parse_only: request.options.parse_only,
        destination: config.custom_documents_dir(),
        progress: config.progress_callback.clone(),
    };

    tokio::task::spawn_blocking(move || job.run(source))
        .await
        .map_err(|e| CollectorError::Internal(format!("Text conversion task panicked: {}", e)))?
}

struct TextJob {
    name: String,
    metadata: crate::request::DocumentOverrides,
    parse_only: bool,
    destination: PathBuf,
    progress: Option<Arc<dyn ConversionProgressCallback>>,
}

impl TextJob {
    fn run(self, source: TransientSource) -> Result<Vec<CanonicalDocument>, CollectorError> {
        if let Some(ref cb) = self.progress {
            cb.on_conversion_start(1);
            cb.on_unit_start(0, 1, &self.name);
        }

        let result = self.build(&source);
        drop(source);

        if let Some(ref cb) = self.progress {
            match &result {
                Ok(doc) => cb.on_unit_complete(0, 1, &self.name, doc.word_count),
                Err(e) => cb.on_unit_skipped(0, 1, &self.name, &e.to_string()),
            }
            cb.on_conversion_complete(1, usize::from(result.is_ok()));
        }

        result.map(|doc| vec![doc])
    }

    fn build(&self, source: &TransientSource) -> Result<CanonicalDocument, CollectorError> {
        let start = Instant::now();
        let path = source.path();
        let is_csv = self.name.to_lowercase().ends_with(".csv");
        let published = file_timestamp(path);

        let bytes = std::fs::read(path).map_err(|e| CollectorError::ReadError {
            name: self.name.clone(),
            detail: e.to_string(),
        })?;
        let content = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        debug!("Read {} ({} bytes)", self.name, content.len());

        if content.is_empty() {
            return Err(CollectorError::EmptyContent {
                name: self.name.clone(),
            });
        }
        if is_csv {
            debug!("{} has {} lines", self.name, content.lines().count());
        }

        let words = word_count(&content);
        let tokens = estimate_tokens(&content);

        let id = Uuid::new_v4();
        let doc = CanonicalDocument {
            id,
            url: format!("file://{}", path.display()),
            title: self.metadata.title_or(self.name.as_str()),
            doc_author: self.metadata.doc_author_or("Unknown"),
            description: self.metadata.description_or("Unknown"),
            doc_source: self
                .metadata
                .doc_source_or(if is_csv { CSV_SOURCE } else { TEXT_SOURCE }),
            chunk_source: self.metadata.chunk_source_or(""),
            published,
            word_count: words,
            page_content: content,
            token_count_estimate: tokens,
            location: None,
        };

        let target = WriteTarget::new(&self.destination, format!("{}-{}", slugify(&self.name), id));
        let doc = write_document(doc, &target, self.parse_only)?;

        info!(
            "[SUCCESS]: {} converted & ready for embedding ({} words, {} tokens, {}ms)",
            self.name,
            words,
            tokens,
            start.elapsed().as_millis()
        );
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::DocumentOverrides;
    use tempfile::TempDir;

    fn setup() -> (TempDir, CollectorConfig) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("hot")).unwrap();
        let config = CollectorConfig::builder()
            .staging_root(dir.path().join("hot"))
            .documents_root(dir.path().join("documents"))
            .build()
            .unwrap();
        (dir, config)
    }

    fn stage(config: &CollectorConfig, name: &str, content: &[u8]) -> TransientSource {
        let p = config.staging_root.join(name);
        std::fs::write(&p, content).unwrap();
        TransientSource::claim(p)
    }

    #[tokio::test]
    async fn preview_document_mirrors_text() {
        let (_dir, config) = setup();
        let text = "alpha  beta\n\ngamma\tdelta ";
        let source = stage(&config, "notes.txt", text.as_bytes());
        let staged = source.path().to_path_buf();
        let req = ConversionRequest::new("notes.txt").parse_only(true);

        let docs = convert_text(source, &req, &config).await.unwrap();
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.page_content, text);
        assert_eq!(doc.word_count, 4);
        assert!(doc.token_count_estimate > 0);
        assert_eq!(doc.title, "notes.txt");
        assert_eq!(doc.doc_author, "Unknown");
        assert_eq!(doc.doc_source, TEXT_SOURCE);
        assert!(doc.url.starts_with("file://"));
        assert!(doc.location.is_none());
        assert!(!staged.exists());
        assert!(!config.documents_root.exists());
    }

    #[tokio::test]
    async fn csv_default_source_and_overrides() {
        let (_dir, config) = setup();
        let source = stage(&config, "Data.CSV", b"a,b\n1,2\n");
        let req = ConversionRequest::new("Data.CSV")
            .parse_only(true)
            .metadata(DocumentOverrides {
                title: Some("Inventory".into()),
                chunk_source: Some("upload://42".into()),
                ..Default::default()
            });

        let doc = convert_text(source, &req, &config).await.unwrap().remove(0);
        assert_eq!(doc.doc_source, CSV_SOURCE);
        assert_eq!(doc.title, "Inventory");
        assert_eq!(doc.chunk_source, "upload://42");
    }

    #[tokio::test]
    async fn persist_writes_into_custom_documents() {
        let (_dir, config) = setup();
        let source = stage(&config, "Meeting Notes.md", b"# Agenda\n- budget");
        let req = ConversionRequest::new("Meeting Notes.md");

        let doc = convert_text(source, &req, &config).await.unwrap().remove(0);
        let expected = format!("custom-documents/meeting-notes.md-{}.json", doc.id);
        assert_eq!(doc.location.as_deref(), Some(expected.as_str()));
        assert!(config.documents_root.join(&expected).exists());
    }

    #[tokio::test]
    async fn empty_file_fails_and_is_deleted() {
        let (_dir, config) = setup();
        let source = stage(&config, "empty.txt", b"");
        let staged = source.path().to_path_buf();
        let err = convert_text(source, &ConversionRequest::new("empty.txt"), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::EmptyContent { .. }));
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn unreadable_source_is_read_error() {
        let (_dir, config) = setup();
        let source = TransientSource::claim(config.staging_root.join("vanished.txt"));
        let err = convert_text(source, &ConversionRequest::new("vanished.txt"), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::ReadError { .. }));
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_rejected() {
        let (_dir, config) = setup();
        let source = stage(&config, "latin1.txt", b"caf\xe9 au lait");
        let doc = convert_text(source, &ConversionRequest::new("latin1.txt").parse_only(true), &config)
            .await
            .unwrap()
            .remove(0);
        assert!(doc.page_content.starts_with("caf"));
        assert_eq!(doc.word_count, 3);
    }
}
