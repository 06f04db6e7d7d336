//! Fileset differencing and diff replay.

use crate::fileset::FileSet;
use tracing::warn;

/// The delta turning one fileset into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSetDiff {
    /// Digests whose path sets appear in the new fileset.
    pub added: FileSet,
    /// Digests whose path sets disappear from the old fileset.
    pub removed: FileSet,
}

impl FileSetDiff {
    /// True when neither side records anything.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Anomalies found while replaying a diff.
///
/// A non-zero count means the fileset being patched did not match what the
/// revision chain claims, which points at a corrupted revision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Removals of digests that were not present.
    pub missing_removals: usize,
    /// Additions of digests that were already present.
    pub duplicate_additions: usize,
}

impl ApplyStats {
    pub fn is_clean(&self) -> bool {
        self.missing_removals == 0 && self.duplicate_additions == 0
    }
}

/// Compute the delta from `old` to `new`.
///
/// Works at digest granularity: when a digest exists on both sides with
/// different path sets, the whole old set is recorded as removed and the whole
/// new set as added. A rename therefore shows up as a replacement of every
/// path sharing that content.
pub fn diff(old: &FileSet, new: &FileSet) -> FileSetDiff {
    let mut result = FileSetDiff::default();

    for (hash, new_paths) in new {
        match old.get(hash) {
            None => {
                result.added.insert_set(*hash, new_paths.clone());
            }
            Some(old_paths) if old_paths != new_paths => {
                result.removed.insert_set(*hash, old_paths.clone());
                result.added.insert_set(*hash, new_paths.clone());
            }
            Some(_) => {}
        }
    }

    for (hash, old_paths) in old {
        if !new.contains(hash) {
            result.removed.insert_set(*hash, old_paths.clone());
        }
    }

    result
}

/// Apply a recorded delta to `fileset` in place.
///
/// Every digest in `removed` is dropped first, then every digest in `added`
/// is inserted. Inconsistencies are logged and counted but never abort the
/// replay.
pub fn apply_diff(fileset: &mut FileSet, added: &FileSet, removed: &FileSet) -> ApplyStats {
    let mut stats = ApplyStats::default();

    for hash in removed.hashes() {
        if fileset.remove(hash).is_none() {
            warn!(
                hash = %hash,
                "attempted to remove a digest the fileset does not contain; \
                 a revision file is probably corrupted, continuing"
            );
            stats.missing_removals += 1;
        }
    }

    for (hash, paths) in added {
        if fileset.contains(hash) {
            warn!(
                hash = %hash,
                "attempted to add a digest the fileset already contains; \
                 a revision file is probably corrupted, continuing"
            );
            stats.duplicate_additions += 1;
        } else {
            fileset.insert_set(*hash, paths.clone());
        }
    }

    stats
}
