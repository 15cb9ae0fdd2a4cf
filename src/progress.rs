//! Progress-callback trait for per-unit conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::CollectorConfigBuilder::progress_callback`] to receive
//! events as each unit (a sheet, or the whole file for text sources) is
//! converted. In persist mode a sheet's record is already on disk by the time
//! `on_unit_complete` fires, so callers can start indexing it before the rest
//! of the workbook finishes.
//!
//! # Example
//!
//! ```rust
//! use edgequake_collector::ConversionProgressCallback;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_unit_complete(&self, index: usize, total: usize, name: &str, word_count: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {name}: {word_count} words", index + 1, total);
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the pipeline as it converts each unit.
///
/// Sheets are rendered concurrently, so `on_unit_*` methods may be called
/// from several threads at once and in any order. Implementations must guard
/// shared mutable state themselves.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the source has been opened and its units counted.
    fn on_conversion_start(&self, total_units: usize) {
        let _ = total_units;
    }

    /// Called when a unit (0-indexed) begins converting.
    fn on_unit_start(&self, index: usize, total_units: usize, name: &str) {
        let _ = (index, total_units, name);
    }

    /// Called when a unit produced a document.
    fn on_unit_complete(&self, index: usize, total_units: usize, name: &str, word_count: usize) {
        let _ = (index, total_units, name, word_count);
    }

    /// Called when a unit was empty, failed or was cancelled.
    fn on_unit_skipped(&self, index: usize, total_units: usize, name: &str, reason: &str) {
        let _ = (index, total_units, name, reason);
    }

    /// Called once after every unit has been attempted.
    fn on_conversion_complete(&self, total_units: usize, produced: usize) {
        let _ = (total_units, produced);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CollectorConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
