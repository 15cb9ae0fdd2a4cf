//! Path guard: resolve an untrusted relative name against the staging root.
//!
//! The name is normalised lexically (`.` dropped, `..` pops a segment, an
//! absolute name restarts from the filesystem root) before it is joined, so
//! the descendant check sees the path the filesystem would actually open.
//! After the file is known to exist it is canonicalised and checked again,
//! which catches symlinks planted inside the staging root that point out of
//! it or at the sentinel. Nothing here touches the file.

use crate::config::CollectorConfig;
use crate::error::CollectorError;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// A staged file that passed every guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedPath {
    /// Canonical absolute path inside the staging root.
    pub absolute: PathBuf,
    /// Normalised name relative to the staging root, `/`-separated.
    pub relative: String,
}

/// Resolve `name` against `config.staging_root`.
///
/// Checks run in a fixed order: traversal (`InvalidPath`), sentinel
/// (`ReservedName`), existence (`NotFound`).
pub async fn guard_target(config: &CollectorConfig, name: &str) -> Result<GuardedPath, CollectorError> {
    let root = &config.staging_root;
    let resolved = normalize_against(root, name);

    if !is_strict_descendant(root, &resolved) {
        debug!("Rejected '{}': resolves to {}", name, resolved.display());
        return Err(CollectorError::InvalidPath {
            name: name.to_string(),
        });
    }

    let relative = relative_name(root, &resolved);
    if config.is_reserved(&relative) {
        return Err(CollectorError::ReservedName {
            name: name.to_string(),
        });
    }

    match tokio::fs::metadata(&resolved).await {
        Ok(meta) if meta.is_file() => {}
        _ => {
            return Err(CollectorError::NotFound {
                name: name.to_string(),
            })
        }
    }

    let absolute = tokio::fs::canonicalize(&resolved)
        .await
        .map_err(|_| CollectorError::NotFound {
            name: name.to_string(),
        })?;
    if !is_strict_descendant(root, &absolute) {
        debug!("Rejected '{}': links to {}", name, absolute.display());
        return Err(CollectorError::InvalidPath {
            name: name.to_string(),
        });
    }
    if config.is_reserved(&relative_name(root, &absolute)) {
        debug!("Rejected '{}': links to the sentinel", name);
        return Err(CollectorError::ReservedName {
            name: name.to_string(),
        });
    }

    Ok(GuardedPath { absolute, relative })
}

/// Lexically join `name` onto `root`, collapsing `.` and `..` segments.
pub fn normalize_against(root: &Path, name: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for component in Path::new(name).components() {
        match component {
            Component::Prefix(prefix) => out = PathBuf::from(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

fn is_strict_descendant(root: &Path, path: &Path) -> bool {
    path != root && path.starts_with(root)
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}
