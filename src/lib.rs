//! # edgequake-collector
//!
//! Turn files dropped into a staging directory into canonical document
//! records ready for chunking and embedding.
//!
//! ## Pipeline Overview
//!
//! ```text
//! staged file
//!  │
//!  ├─ 1. Guard    resolve the untrusted name inside the staging root
//!  ├─ 2. Resolve  extension table, then content sniffing for unknown types
//!  ├─ 3. Convert  text/CSV → 1 document, workbook → 1 document per sheet
//!  │              (sheets fan out over a capped worker pool)
//!  ├─ 4. Write    preview: return only; persist: JSON records on disk
//!  └─ 5. Cleanup  the staged file is deleted once a converter owns it
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_collector::{Collector, CollectorConfig, ConversionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CollectorConfig::builder()
//!         .staging_root("hotdir")
//!         .documents_root("storage/documents")
//!         .build()?;
//!     let collector = Collector::new(config);
//!
//!     let result = collector
//!         .convert(&ConversionRequest::new("quarterly.xlsx"))
//!         .await;
//!     for doc in &result.documents {
//!         println!("{} ({} words)", doc.title, doc.word_count);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `collector` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-collector = { version = "0.1", default-features = false }
//! ```
//!
//! ## Supported Formats
//!
//! | Extensions | Converter | Output |
//! |------------|-----------|--------|
//! | `.txt .md .org .adoc .rst .csv` | text | one document with the raw text |
//! | `.xlsx .xlsm .xls .ods` | spreadsheet | one document per non-empty sheet (persist) or one combined document (preview) |
//! | anything else that looks like text | text | as above |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod request;
pub mod tokens;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CollectorConfig, CollectorConfigBuilder};
pub use convert::Collector;
pub use error::{CollectorError, FailureKind, UnitError};
pub use output::{CanonicalDocument, ConversionResult};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use request::{ConversionRequest, ConvertOptions, DocumentOverrides};
pub use tokio_util::sync::CancellationToken;
