//! Document writer: finalise a [`CanonicalDocument`] and, in persist mode,
//! store it as a JSON record under the documents root.
//!
//! Records are written to a temp file in the destination directory and then
//! renamed into place without clobbering, so concurrent requests never see a
//! half-written record and never overwrite one another. If the preferred
//! name is taken, the document id is appended to it.
//!
//! All functions here block on file I/O; call them from `spawn_blocking`.

use crate::error::CollectorError;
use crate::output::CanonicalDocument;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

static RE_UNSAFE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}._-]+").unwrap());
static RE_DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

/// Filesystem-safe, lower-case form of a human-readable name.
///
/// Letters and digits of any script survive; every other run of characters
/// except `.`, `_` and `-` becomes a single `-`. Leading/trailing dots and
/// dashes are trimmed so the slug can never be `.`/`..` or a hidden file.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let replaced = RE_UNSAFE_RUN.replace_all(&lowered, "-");
    let collapsed = RE_DASH_RUN.replace_all(&replaced, "-");
    let slug = collapsed.trim_matches(|c| c == '-' || c == '.');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

/// Where a persisted record goes.
#[derive(Debug, Clone)]
pub struct WriteTarget {
    /// Directory the record is written into; created if absent.
    pub dir: PathBuf,
    /// File name without the `.json` extension.
    pub stem: String,
}

impl WriteTarget {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
        }
    }
}

/// Finalise `doc` for the caller.
///
/// In preview mode (`parse_only`) the record is returned untouched. In
/// persist mode it is written to `target` and returned with `location` set
/// to `<folder>/<file>.json`.
pub fn write_document(
    mut doc: CanonicalDocument,
    target: &WriteTarget,
    parse_only: bool,
) -> Result<CanonicalDocument, CollectorError> {
    if parse_only {
        return Ok(doc);
    }

    let preferred = target.dir.join(format!("{}.json", target.stem));
    let fail = |path: &Path, source: std::io::Error| CollectorError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(&target.dir).map_err(|e| fail(&target.dir, e))?;

    doc.location = None;
    let body = to_record_json(&doc).map_err(|e| fail(&preferred, e))?;

    let mut tmp = NamedTempFile::new_in(&target.dir).map_err(|e| fail(&preferred, e))?;
    tmp.write_all(&body).map_err(|e| fail(&preferred, e))?;
    tmp.flush().map_err(|e| fail(&preferred, e))?;

    let written = match tmp.persist_noclobber(&preferred) {
        Ok(_) => preferred,
        Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
            let fallback = target.dir.join(format!("{}-{}.json", target.stem, doc.id));
            debug!(
                "{} exists; writing {} instead",
                preferred.display(),
                fallback.display()
            );
            err.file
                .persist_noclobber(&fallback)
                .map_err(|e| fail(&fallback, e.error))?;
            fallback
        }
        Err(err) => return Err(fail(&preferred, err.error)),
    };

    debug!("Wrote document {} → {}", doc.id, written.display());
    doc.location = Some(store_location(&written));
    Ok(doc)
}

/// Pretty JSON with four-space indentation, as the indexing layer expects.
fn to_record_json(doc: &CanonicalDocument) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(buf)
}

/// Last two path components, `/`-joined.
fn store_location(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .rev()
        .take(2)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.into_iter().rev().collect::<Vec<_>>().join("/")
}
