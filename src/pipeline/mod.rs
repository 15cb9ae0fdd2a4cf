//! Pipeline stages for document collection.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own with a temp directory and nothing else.
//!
//! ## Data Flow
//!
//! ```text
//! guard ──▶ resolve ──▶ text | spreadsheet ──▶ writer
//! (path)    (table/sniff)  (convert)           (record)
//!                 └───────── cleanup (on every exit) ─────────┘
//! ```
//!
//! 1. [`guard`]   resolve the user-supplied name against the staging root
//! 2. [`resolve`] pick a converter from the extension table, or sniff content
//! 3. [`text`]    whole-file text/CSV → one document
//! 4. [`spreadsheet`] workbook → one document per non-empty sheet; uses
//!    [`render`] for the grid → delimited-text step
//! 5. [`writer`]  finalise records and, in persist mode, store them
//! 6. [`cleanup`] delete the staged source once a converter owns it

pub mod cleanup;
pub mod guard;
pub mod render;
pub mod resolve;
pub mod spreadsheet;
pub mod text;
pub mod writer;

use chrono::{DateTime, Utc};
use std::path::Path;

/// Creation time of `path`, falling back to modification time, then now.
pub(crate) fn file_timestamp(path: &Path) -> DateTime<Utc> {
    std::fs::metadata(path)
        .and_then(|m| m.created().or_else(|_| m.modified()))
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_of_missing_file_is_now() {
        let before = Utc::now();
        let ts = file_timestamp(Path::new("/definitely/not/here.txt"));
        assert!(ts >= before);
    }

    #[test]
    fn timestamp_of_fresh_file_is_recent() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.txt");
        std::fs::write(&p, "x").unwrap();
        let age = Utc::now() - file_timestamp(&p);
        assert!(age.num_seconds() < 60);
    }
}
