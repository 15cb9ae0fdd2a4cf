//! Conversion entry points.
//!
//! [`Collector`] is the dispatcher: it runs the path guard, resolves the
//! converter, hands the staged file over to it and returns the documents.
//! Validation failures (bad path, reserved name, missing file, missing
//! extension) leave the staged file alone; once a converter has claimed the
//! file it is deleted on every exit.

use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::output::{CanonicalDocument, ConversionResult};
use crate::pipeline::cleanup::TransientSource;
use crate::pipeline::resolve::{self, ConverterKind};
use crate::pipeline::{guard, spreadsheet, text};
use crate::request::ConversionRequest;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Converts staged files into canonical documents.
///
/// Cheap to clone; clones share the same configuration. Independent
/// requests may run concurrently on the same collector.
///
/// # Example
/// ```rust,no_run
/// use edgequake_collector::{Collector, CollectorConfig, ConversionRequest};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CollectorConfig::builder()
///     .staging_root("/srv/collector/hotdir")
///     .documents_root("/srv/storage/documents")
///     .build()?;
/// let collector = Collector::new(config);
///
/// let result = collector.convert(&ConversionRequest::new("report.xlsx")).await;
/// if !result.success {
///     eprintln!("{}", result.reason.unwrap_or_default());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Collector {
    config: Arc<CollectorConfig>,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Convert one staged file.
    ///
    /// Never fails: any error is folded into a [`ConversionResult`] with
    /// `success = false` and the error's message as `reason`.
    pub async fn convert(&self, request: &ConversionRequest) -> ConversionResult {
        self.convert_with_cancel(request, CancellationToken::new()).await
    }

    /// Like [`Collector::convert`], but sheets not yet finished when `cancel`
    /// fires are skipped.
    pub async fn convert_with_cancel(
        &self,
        request: &ConversionRequest,
        cancel: CancellationToken,
    ) -> ConversionResult {
        match self.try_convert_with_cancel(request, &cancel).await {
            Ok(documents) => ConversionResult::ok(documents),
            Err(e) => ConversionResult::failed(e.to_string()),
        }
    }

    /// Convert one staged file, returning the fatal error as a typed value.
    pub async fn try_convert(
        &self,
        request: &ConversionRequest,
    ) -> Result<Vec<CanonicalDocument>, CollectorError> {
        self.try_convert_with_cancel(request, &CancellationToken::new())
            .await
    }

    async fn try_convert_with_cancel(
        &self,
        request: &ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<CanonicalDocument>, CollectorError> {
        let span = info_span!("convert", target = %request.target_name);
        async {
            let start = Instant::now();
            let result = self.dispatch(request, cancel).await;
            let elapsed = start.elapsed().as_millis();
            match &result {
                Ok(docs) => info!(
                    "Converted {} into {} document(s) in {}ms",
                    request.target_name,
                    docs.len(),
                    elapsed
                ),
                Err(e) if e.is_validation() => {
                    warn!("Rejected {}: {}", request.target_name, e)
                }
                Err(e) => warn!(
                    "Conversion of {} failed after {}ms: {}",
                    request.target_name, elapsed, e
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn dispatch(
        &self,
        request: &ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<CanonicalDocument>, CollectorError> {
        info!(
            "Processing {} (parse_only={})",
            request.target_name, request.options.parse_only
        );

        // ── Step 1: Path guard ───────────────────────────────────────────
        let guarded = guard::guard_target(&self.config, &request.target_name).await?;
        debug!("Resolved to {}", guarded.absolute.display());

        // ── Step 2: Converter selection ──────────────────────────────────
        let sniff_bytes = self.config.sniff_bytes;
        let path = guarded.absolute.clone();
        let resolved = tokio::task::spawn_blocking(move || resolve::resolve(&path, sniff_bytes))
            .await
            .map_err(|e| CollectorError::Internal(format!("Type resolution task panicked: {}", e)))??;
        info!(
            "Using {:?} converter for {} ({})",
            resolved.kind,
            guarded.relative,
            if resolved.extension.is_empty() {
                "no extension"
            } else {
                resolved.extension.as_str()
            }
        );

        // ── Step 3: Convert; the source is ours from here on ─────────────
        let source = TransientSource::claim(resolved.path);
        match resolved.kind {
            ConverterKind::Text => text::convert_text(source, request, &self.config).await,
            ConverterKind::Spreadsheet => {
                spreadsheet::convert_spreadsheet(source, request, &self.config, cancel).await
            }
        }
    }

    /// Synchronous wrapper around [`Collector::convert`].
    ///
    /// Creates a new tokio runtime; do not call from inside an async context.
    pub fn convert_sync(&self, request: &ConversionRequest) -> ConversionResult {
        match tokio::runtime::Runtime::new() {
            Ok(rt) => rt.block_on(self.convert(request)),
            Err(e) => ConversionResult::failed(
                CollectorError::Internal(format!("Failed to create tokio runtime: {}", e))
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use tempfile::TempDir;

    fn collector() -> (TempDir, Collector) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("hot")).unwrap();
        let config = CollectorConfig::builder()
            .staging_root(dir.path().join("hot"))
            .documents_root(dir.path().join("documents"))
            .build()
            .unwrap();
        (dir, Collector::new(config))
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let (_dir, c) = collector();
        let err = c.try_convert(&ConversionRequest::new("nope.txt")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[tokio::test]
    async fn failure_reason_is_error_message() {
        let (_dir, c) = collector();
        let result = c.convert(&ConversionRequest::new("../escape.txt")).await;
        assert!(!result.success);
        assert!(result.documents.is_empty());
        assert_eq!(
            result.reason.as_deref(),
            Some("Filename '../escape.txt' is not a valid path to process.")
        );
    }

    #[tokio::test]
    async fn missing_extension_keeps_source() {
        let (_dir, c) = collector();
        let staged = c.config().staging_root.join("draft.");
        std::fs::write(&staged, "hello").unwrap();
        let err = c.try_convert(&ConversionRequest::new("draft.")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::MissingExtension);
        assert!(staged.exists());
    }

    #[tokio::test]
    async fn extensionless_text_is_sniffed_and_converted() {
        let (_dir, c) = collector();
        let staged = c.config().staging_root.join("README");
        std::fs::write(&staged, "read me first").unwrap();
        let docs = c
            .try_convert(&ConversionRequest::new("README").parse_only(true))
            .await
            .unwrap();
        assert_eq!(docs[0].word_count, 3);
        assert!(!staged.exists());
    }

    #[test]
    fn sync_wrapper_runs_outside_a_runtime() {
        let (_dir, c) = collector();
        std::fs::write(c.config().staging_root.join("a.md"), "# Title").unwrap();
        let result = c.convert_sync(&ConversionRequest::new("a.md").parse_only(true));
        assert!(result.success, "{:?}", result.reason);
        assert_eq!(result.documents.len(), 1);
    }
}
