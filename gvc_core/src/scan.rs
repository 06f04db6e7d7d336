//! Filesystem walking and fileset construction.

use crate::error::{Error, Result};
use crate::fileset::{FileSet, PATH_SEPARATOR};
use crate::hash::Algorithm;
use crate::repo::MARKER_DIR;
use std::fs;
use std::path::{Component, Path};
use tracing::{debug, warn};

/// Snapshot every regular file under `root` into a fileset.
///
/// Paths are recorded relative to `root` with `/` separators. Directories are
/// not recorded, the repository marker directory at the root is never entered,
/// and symlinks and special files are skipped with a warning. Any traversal or
/// read error aborts the whole scan.
pub fn scan(root: &Path, algorithm: Algorithm) -> Result<FileSet> {
    let metadata = fs::metadata(root)?;
    if !metadata.is_dir() {
        return Err(Error::invalid_path(root, "scan root is not a directory"));
    }

    let mut fileset = FileSet::new();

    // Nothing is filtered except the marker directory: no .gitignore, hidden
    // files included.
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| !(entry.depth() == 1 && entry.file_name() == MARKER_DIR))
        .build();

    for entry in walker {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }

        let entry_path = entry.path();
        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            continue;
        }

        if !file_type.is_file() {
            if file_type.is_symlink() {
                warn!(path = %entry_path.display(), "skipping symlink");
            } else {
                warn!(path = %entry_path.display(), "skipping special file");
            }
            continue;
        }

        let hash = algorithm.hash_file(entry_path)?;
        let relative = relative_path(root, entry_path)?;
        debug!(path = %relative, hash = %hash.short(), "scanned file");
        fileset.insert(hash, relative);
    }

    debug!(
        root = %root.display(),
        digests = fileset.len(),
        paths = fileset.path_count(),
        "scan complete"
    );

    Ok(fileset)
}

/// Render `path` relative to `root` using `/` regardless of platform.
pub fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let stripped = path
        .strip_prefix(root)
        .map_err(|_| Error::invalid_path(path, "path is outside the scan root"))?;

    let mut parts = Vec::new();
    for component in stripped.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| Error::invalid_path(path, "path is not valid UTF-8"))?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => return Err(Error::invalid_path(path, "unexpected path component")),
        }
    }

    if parts.is_empty() {
        return Err(Error::invalid_path(path, "path is the scan root itself"));
    }

    Ok(parts.join(&PATH_SEPARATOR.to_string()))
}
