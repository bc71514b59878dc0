//! Content-tree scanning.
//!
//! Walks the content root respecting .gitignore and produces the
//! `{relative path -> mtime}` map consumed by change detection.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::UNIX_EPOCH;

use ignore::WalkBuilder;

use crate::Result;

/// Scan the content root for candidate documents.
///
/// Returns relative posix paths mapped to mtimes in Unix milliseconds.
/// A file whose stat fails mid-scan is logged and excluded, not crashed on.
///
/// # Errors
///
/// Returns an error only when the root itself cannot be walked.
pub fn scan_content(content_dir: &Path) -> Result<BTreeMap<String, i64>> {
    let mut current = BTreeMap::new();

    let walker = WalkBuilder::new(content_dir)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .ignore(true)
        .parents(true)
        .build();

    for entry in walker {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_dir() || path.extension().map_or(true, |ext| ext != "md") {
                    continue;
                }

                let Ok(relative) = path.strip_prefix(content_dir) else {
                    continue;
                };
                let relative = to_posix(relative);

                match mtime_ms(path) {
                    Ok(mtime) => {
                        current.insert(relative, mtime);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error walking content directory");
            }
        }
    }

    tracing::debug!(
        root = %content_dir.display(),
        files = current.len(),
        "Content scan complete"
    );

    Ok(current)
}

/// Modification time in Unix milliseconds.
pub fn mtime_ms(path: &Path) -> std::io::Result<i64> {
    let modified = std::fs::metadata(path)?.modified()?;
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    Ok(i64::try_from(millis).unwrap_or(i64::MAX))
}

fn to_posix(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.to_string()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}
