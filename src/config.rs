//! Configuration for the collector.
//!
//! All process-wide settings live in one immutable [`CollectorConfig`],
//! built once at startup through [`CollectorConfigBuilder`] and handed to
//! [`crate::Collector`]. Nothing in the pipeline reads ambient globals: the
//! staging root, documents root and worker cap all come from here.

use crate::error::CollectorError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::{Path, PathBuf};

/// Sentinel files the staging mechanism writes into the staging root.
pub const DEFAULT_RESERVED_NAMES: &[&str] = &["__HOTDIR__.md"];

/// Folder under the documents root for single-file documents.
pub const CUSTOM_DOCUMENTS_FOLDER: &str = "custom-documents";

/// Configuration for a [`crate::Collector`].
///
/// # Example
/// ```rust,no_run
/// use edgequake_collector::CollectorConfig;
///
/// let config = CollectorConfig::builder()
///     .staging_root("/srv/collector/hotdir")
///     .documents_root("/srv/storage/documents")
///     .concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CollectorConfig {
    /// Directory holding files awaiting conversion. Canonicalised by `build()`.
    pub staging_root: PathBuf,

    /// Root of the documents store written in persist mode.
    pub documents_root: PathBuf,

    /// Names (relative to the staging root) that must never be converted.
    pub reserved_names: Vec<String>,

    /// Maximum number of sheets rendered at once. Default: number of CPUs.
    ///
    /// Sheet rendering is CPU-bound and runs on the blocking pool, so going
    /// much above the core count only adds memory pressure.
    pub concurrency: usize,

    /// Bytes read from the head of an unregistered file to decide whether it
    /// is text. Default: 1024.
    pub sniff_bytes: usize,

    /// Optional per-unit progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            staging_root: PathBuf::new(),
            documents_root: PathBuf::new(),
            reserved_names: DEFAULT_RESERVED_NAMES.iter().map(|s| s.to_string()).collect(),
            concurrency: num_cpus::get().max(1),
            sniff_bytes: 1024,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CollectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorConfig")
            .field("staging_root", &self.staging_root)
            .field("documents_root", &self.documents_root)
            .field("reserved_names", &self.reserved_names)
            .field("concurrency", &self.concurrency)
            .field("sniff_bytes", &self.sniff_bytes)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl CollectorConfig {
    /// Create a new builder for `CollectorConfig`.
    pub fn builder() -> CollectorConfigBuilder {
        CollectorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Destination for single-file documents in persist mode.
    pub fn custom_documents_dir(&self) -> PathBuf {
        self.documents_root.join(CUSTOM_DOCUMENTS_FOLDER)
    }

    pub fn is_reserved(&self, relative_name: &str) -> bool {
        self.reserved_names.iter().any(|r| r == relative_name)
    }
}

/// Builder for [`CollectorConfig`].
#[derive(Debug)]
pub struct CollectorConfigBuilder {
    config: CollectorConfig,
}

impl CollectorConfigBuilder {
    pub fn staging_root(mut self, path: impl AsRef<Path>) -> Self {
        self.config.staging_root = path.as_ref().to_path_buf();
        self
    }

    pub fn documents_root(mut self, path: impl AsRef<Path>) -> Self {
        self.config.documents_root = path.as_ref().to_path_buf();
        self
    }

    pub fn reserved_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.reserved_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn sniff_bytes(mut self, n: usize) -> Self {
        self.config.sniff_bytes = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<CollectorConfig, CollectorError> {
        let c = &self.config;
        if c.staging_root.as_os_str().is_empty() {
            return Err(CollectorError::InvalidConfig(
                "staging root is not set".into(),
            ));
        }
        if c.documents_root.as_os_str().is_empty() {
            return Err(CollectorError::InvalidConfig(
                "documents root is not set".into(),
            ));
        }
        if !c.staging_root.is_dir() {
            return Err(CollectorError::InvalidConfig(format!(
                "staging root '{}' is not a directory",
                c.staging_root.display()
            )));
        }
        if c.concurrency == 0 {
            return Err(CollectorError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.sniff_bytes == 0 {
            return Err(CollectorError::InvalidConfig(
                "sniff sample must be ≥ 1 byte".into(),
            ));
        }

        self.config.staging_root = self.config.staging_root.canonicalize().map_err(|e| {
            CollectorError::InvalidConfig(format!(
                "cannot canonicalise staging root '{}': {e}",
                self.config.staging_root.display()
            ))
        })?;
        Ok(self.config)
    }
}
