//! Error types for the edgequake-collector library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CollectorError`] — **Fatal**: the request cannot produce any document
//!   (path escapes the staging root, unsupported file, every sheet empty).
//!   Returned as `Err(CollectorError)` from [`crate::Collector::try_convert`]
//!   and folded into a [`crate::ConversionResult`] by
//!   [`crate::Collector::convert`].
//!
//! * [`UnitError`] — **Non-fatal**: a single unit (one sheet) failed or was
//!   empty but its siblings are fine. Reported through the progress callback
//!   and the logs; the batch carries on without it.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-collector library.
#[derive(Debug, Error)]
pub enum CollectorError {
    // ── Validation errors (source untouched) ──────────────────────────────
    /// The resolved path is not a descendant of the staging root.
    #[error("Filename '{name}' is not a valid path to process.")]
    InvalidPath { name: String },

    /// The name matches a sentinel file the staging mechanism itself uses.
    #[error("Filename '{name}' is a reserved filename and cannot be processed.")]
    ReservedName { name: String },

    /// Nothing exists at the resolved path.
    #[error("File '{name}' does not exist in the staging directory.")]
    NotFound { name: String },

    // ── Resolution errors ─────────────────────────────────────────────────
    /// The file name contains a dot but has no extension after it.
    #[error("No file extension found for '{name}'. This file cannot be processed.")]
    MissingExtension { name: String },

    /// No converter for the extension and the content does not look like text.
    /// The source is deleted.
    #[error("File extension '{extension}' is not supported for parsing and cannot be assumed as text.")]
    UnsupportedType { extension: String },

    // ── Conversion errors (source deleted) ────────────────────────────────
    /// The source could not be read or parsed.
    #[error("Could not read '{name}': {detail}")]
    ReadError { name: String, detail: String },

    /// The decoded content is zero-length.
    #[error("No text content found in '{name}'.")]
    EmptyContent { name: String },

    /// Every unit of a multi-unit source failed or was empty.
    #[error("No valid sheets found in '{name}' ({total} sheet(s) examined).")]
    NoValidUnits { name: String, total: usize },

    /// The documents store refused a record.
    #[error("Failed to write document '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a worker task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`CollectorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidPath,
    ReservedName,
    NotFound,
    MissingExtension,
    UnsupportedType,
    ReadError,
    EmptyContent,
    NoValidUnits,
    WriteFailed,
    InvalidConfig,
    Internal,
}

impl CollectorError {
    /// Which taxonomy entry this error belongs to.
    pub fn kind(&self) -> FailureKind {
        match self {
            CollectorError::InvalidPath { .. } => FailureKind::InvalidPath,
            CollectorError::ReservedName { .. } => FailureKind::ReservedName,
            CollectorError::NotFound { .. } => FailureKind::NotFound,
            CollectorError::MissingExtension { .. } => FailureKind::MissingExtension,
            CollectorError::UnsupportedType { .. } => FailureKind::UnsupportedType,
            CollectorError::ReadError { .. } => FailureKind::ReadError,
            CollectorError::EmptyContent { .. } => FailureKind::EmptyContent,
            CollectorError::NoValidUnits { .. } => FailureKind::NoValidUnits,
            CollectorError::WriteFailed { .. } => FailureKind::WriteFailed,
            CollectorError::InvalidConfig(_) => FailureKind::InvalidConfig,
            CollectorError::Internal(_) => FailureKind::Internal,
        }
    }

    /// True for failures raised before a converter claimed the source.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::InvalidPath
                | FailureKind::ReservedName
                | FailureKind::NotFound
                | FailureKind::MissingExtension
        )
    }
}

/// A non-fatal error for a single unit (sheet).
///
/// The overall conversion continues unless every unit ends up here.
#[derive(Debug, Clone, Error)]
pub enum UnitError {
    /// The sheet rendered to no content.
    #[error("Sheet '{sheet}' is empty")]
    Empty { sheet: String },

    /// Reading, rendering or writing the sheet failed.
    #[error("Sheet '{sheet}' failed: {detail}")]
    Failed { sheet: String, detail: String },

    /// The request was cancelled before the sheet finished.
    #[error("Sheet '{sheet}' cancelled")]
    Cancelled { sheet: String },
}

impl UnitError {
    /// Name of the sheet this error belongs to.
    pub fn sheet(&self) -> &str {
        match self {
            UnitError::Empty { sheet }
            | UnitError::Failed { sheet, .. }
            | UnitError::Cancelled { sheet } => sheet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_valid_units_display() {
        let e = CollectorError::NoValidUnits {
            name: "book.xlsx".into(),
            total: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("book.xlsx"), "got: {msg}");
        assert!(msg.contains("3 sheet"), "got: {msg}");
    }

    #[test]
    fn unsupported_type_display() {
        let e = CollectorError::UnsupportedType {
            extension: ".bin".into(),
        };
        assert!(e.to_string().contains(".bin"));
        assert_eq!(e.kind(), FailureKind::UnsupportedType);
    }

    #[test]
    fn validation_kinds() {
        assert!(CollectorError::InvalidPath { name: "x".into() }.is_validation());
        assert!(CollectorError::ReservedName { name: "x".into() }.is_validation());
        assert!(!CollectorError::EmptyContent { name: "x".into() }.is_validation());
        assert!(!CollectorError::UnsupportedType {
            extension: ".x".into()
        }
        .is_validation());
    }

    #[test]
    fn unit_error_display() {
        let e = UnitError::Failed {
            sheet: "Q3".into(),
            detail: "bad cell".into(),
        };
        assert!(e.to_string().contains("Q3"));
        assert!(e.to_string().contains("bad cell"));
    }
}
