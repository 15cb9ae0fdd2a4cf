//! Best-effort removal of the transient source file.
//!
//! Once a converter is selected the pipeline owns the staged file. Ownership
//! is modelled by [`TransientSource`]: whoever holds it may read the file,
//! and dropping it deletes the file exactly once, whichever way the converter
//! exits (success, early `?` return, or a panic unwinding through it).

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Delete `path`, logging instead of failing.
///
/// Returns `true` if the file is gone afterwards (including when it was
/// already missing).
pub fn trash_file(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed transient source {}", path.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!("Could not remove transient source {}: {}", path.display(), e);
            false
        }
    }
}

/// A staged file claimed by a converter; deleted when dropped.
#[derive(Debug)]
pub struct TransientSource {
    path: PathBuf,
}

impl TransientSource {
    pub fn claim(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TransientSource {
    fn drop(&mut self) {
        trash_file(&self.path);
    }
}
