//! Type resolver: map a staged file to the converter that will consume it.
//!
//! Registered extensions come from a static table; there is no runtime
//! loading. Anything unregistered is sniffed: if the head of the file looks
//! like text it goes to the text converter, otherwise it is rejected and
//! deleted, since no later attempt could succeed either.

use crate::error::CollectorError;
use crate::pipeline::cleanup::trash_file;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// The format handlers known to the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterKind {
    /// Whole-file text; one document.
    Text,
    /// Workbook; one document per non-empty sheet.
    Spreadsheet,
}

/// Extension (lower-case, with dot) → converter.
pub const CONVERTERS: &[(&str, ConverterKind)] = &[
    (".txt", ConverterKind::Text),
    (".md", ConverterKind::Text),
    (".org", ConverterKind::Text),
    (".adoc", ConverterKind::Text),
    (".rst", ConverterKind::Text),
    (".csv", ConverterKind::Text),
    (".xlsx", ConverterKind::Spreadsheet),
    (".xlsm", ConverterKind::Spreadsheet),
    (".xls", ConverterKind::Spreadsheet),
    (".ods", ConverterKind::Spreadsheet),
];

/// Look up a registered converter by extension (case-insensitive).
pub fn converter_for(extension: &str) -> Option<ConverterKind> {
    let ext = extension.to_ascii_lowercase();
    CONVERTERS
        .iter()
        .find(|(registered, _)| *registered == ext)
        .map(|(_, kind)| *kind)
}

/// A staged file with its converter decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub path: std::path::PathBuf,
    /// Lower-case extension with leading dot; empty when the name has none.
    pub extension: String,
    pub kind: ConverterKind,
}

/// Extract the lower-case extension of `path`, with a leading dot.
///
/// Returns `Err(MissingExtension)` for names that contain a dot but nothing
/// usable after it (`notes.`, `.env`), and `Ok("")` for names with no dot.
pub fn extension_of(path: &Path) -> Result<String, CollectorError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match path.extension().map(|e| e.to_string_lossy()) {
        Some(ext) if !ext.is_empty() => Ok(format!(".{}", ext.to_lowercase())),
        _ if file_name.contains('.') => Err(CollectorError::MissingExtension { name: file_name }),
        _ => Ok(String::new()),
    }
}

/// Decide which converter handles `path`.
///
/// On `UnsupportedType` the file has already been deleted.
pub fn resolve(path: &Path, sniff_bytes: usize) -> Result<ResolvedSource, CollectorError> {
    let extension = extension_of(path)?;

    if let Some(kind) = converter_for(&extension) {
        debug!("Extension '{}' → {:?}", extension, kind);
        return Ok(ResolvedSource {
            path: path.to_path_buf(),
            extension,
            kind,
        });
    }

    if looks_like_text(path, sniff_bytes) {
        info!(
            "Extension '{}' has no preset converter; processing {} as text",
            extension,
            path.display()
        );
        return Ok(ResolvedSource {
            path: path.to_path_buf(),
            extension,
            kind: ConverterKind::Text,
        });
    }

    warn!("Extension '{}' not supported; discarding {}", extension, path.display());
    trash_file(path);
    Err(CollectorError::UnsupportedType {
        extension: if extension.is_empty() {
            "(none)".to_string()
        } else {
            extension
        },
    })
}

/// Sniff the head of the file for binary markers.
fn looks_like_text(path: &Path, sniff_bytes: usize) -> bool {
    let mut buf = Vec::with_capacity(sniff_bytes);
    let read = std::fs::File::open(path)
        .and_then(|f| f.take(sniff_bytes as u64).read_to_end(&mut buf));
    match read {
        Ok(_) => is_text_sample(&buf),
        Err(e) => {
            warn!("Could not sample {}: {}", path.display(), e);
            false
        }
    }
}

/// A sample is text when it has no NUL byte and fewer than 10% control bytes
/// (tab, LF, CR and FF excluded). An empty sample counts as text.
pub fn is_text_sample(sample: &[u8]) -> bool {
    if sample.contains(&0) {
        return false;
    }
    let control = sample
        .iter()
        .filter(|&&b| (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C)) || b == 0x7F)
        .count();
    control * 10 < sample.len().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn table_lookup_is_case_insensitive() {
        assert_eq!(converter_for(".CSV"), Some(ConverterKind::Text));
        assert_eq!(converter_for(".Xlsx"), Some(ConverterKind::Spreadsheet));
        assert_eq!(converter_for(".pdf"), None);
        assert_eq!(converter_for(""), None);
    }

    #[test]
    fn extension_rules() {
        assert_eq!(extension_of(Path::new("/s/Report.XLSX")).unwrap(), ".xlsx");
        assert_eq!(extension_of(Path::new("/s/README")).unwrap(), "");
        assert!(matches!(
            extension_of(Path::new("/s/notes.")),
            Err(CollectorError::MissingExtension { .. })
        ));
        assert!(matches!(
            extension_of(Path::new("/s/.env")),
            Err(CollectorError::MissingExtension { .. })
        ));
    }

    #[test]
    fn sniffer() {
        assert!(is_text_sample(b"plain text\nwith lines\r\n\tand tabs"));
        assert!(is_text_sample("unicode — текст".as_bytes()));
        assert!(is_text_sample(b""));
        assert!(!is_text_sample(b"PK\x03\x04\x00\x00binary"));
        assert!(!is_text_sample(&[0x01, 0x02, 0x03, b'a', b'b']));
    }

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, bytes).unwrap();
        p
    }

    #[test]
    fn unregistered_text_goes_to_text_converter() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "server.log", b"2024-01-01 started\n");
        let r = resolve(&p, 1024).unwrap();
        assert_eq!(r.kind, ConverterKind::Text);
        assert_eq!(r.extension, ".log");
        assert!(p.exists());
    }

    #[test]
    fn unregistered_binary_is_rejected_and_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "blob.bin", &[0u8, 159, 146, 150, 0, 1]);
        let err = resolve(&p, 1024).unwrap_err();
        assert!(matches!(err, CollectorError::UnsupportedType { .. }));
        assert!(!p.exists());
    }

    #[test]
    fn missing_extension_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "weird.", b"text");
        let err = resolve(&p, 1024).unwrap_err();
        assert!(matches!(err, CollectorError::MissingExtension { .. }));
        assert!(p.exists());
    }

    #[test]
    fn registered_extension_skips_sniffing() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "book.xlsx", b"PK\x03\x04\x00");
        let r = resolve(&p, 1024).unwrap();
        assert_eq!(r.kind, ConverterKind::Spreadsheet);
    }
}
