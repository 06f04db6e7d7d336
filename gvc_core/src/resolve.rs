//! Reconstruction of full filesets from a revision chain.

use crate::diff::{ApplyStats, apply_diff};
use crate::error::Result;
use crate::fileset::FileSet;
use crate::hash::Hash;
use crate::revision::Revision;
use crate::store::RevisionStore;
use std::collections::HashMap;
use tracing::debug;

/// Materializes the fileset at any revision by replaying diffs from the root.
///
/// Parents are loaded from the store on demand. Every fileset the resolver
/// computes is cached by revision hash, so resolving a descendant of an
/// already-resolved revision only replays the new part of the chain.
#[derive(Debug)]
pub struct Resolver<'a> {
    store: &'a RevisionStore,
    cache: HashMap<Hash, FileSet>,
    stats: ApplyStats,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a RevisionStore) -> Self {
        Self {
            store,
            cache: HashMap::new(),
            stats: ApplyStats::default(),
        }
    }

    /// Compute the complete fileset at `revision`.
    ///
    /// A root revision yields its `files_added`. Otherwise the parent's
    /// fileset is resolved and this revision's removals then additions are
    /// applied. Inconsistent entries are logged and skipped; a missing parent
    /// document is an error.
    pub fn resolve(&mut self, revision: &Revision) -> Result<FileSet> {
        if let Some(cached) = self.cache.get(&revision.hash()) {
            return Ok(cached.clone());
        }

        // Collect the unresolved part of the chain, newest first.
        let mut pending = vec![revision.clone()];
        let mut base = FileSet::new();
        loop {
            let Some(parent) = pending.last().and_then(Revision::parent) else {
                break;
            };
            if let Some(cached) = self.cache.get(&parent) {
                base = cached.clone();
                break;
            }
            let parent_revision = self.store.load(&parent)?;
            pending.push(parent_revision);
        }

        debug!(
            target_hash = %revision.hash().short(),
            replayed = pending.len(),
            "resolving fileset"
        );

        let mut fileset = base;
        for rev in pending.iter().rev() {
            if rev.is_root() {
                fileset = rev.files_added().clone();
            } else {
                let stats = apply_diff(&mut fileset, rev.files_added(), rev.files_removed());
                if !stats.is_clean() {
                    debug!(
                        revision = %rev.hash(),
                        missing_removals = stats.missing_removals,
                        duplicate_additions = stats.duplicate_additions,
                        "revision did not apply cleanly"
                    );
                }
                self.stats.missing_removals += stats.missing_removals;
                self.stats.duplicate_additions += stats.duplicate_additions;
            }
            self.cache.insert(rev.hash(), fileset.clone());
        }

        Ok(fileset)
    }

    /// Load the revision stored under `hash` and resolve it.
    pub fn resolve_hash(&mut self, hash: &Hash) -> Result<FileSet> {
        if let Some(cached) = self.cache.get(hash) {
            return Ok(cached.clone());
        }
        let revision = self.store.load(hash)?;
        self.resolve(&revision)
    }

    /// Anomalies accumulated across every diff this resolver replayed.
    pub fn stats(&self) -> ApplyStats {
        self.stats
    }

    /// Number of revisions with a cached fileset.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Resolve a single revision without keeping a cache around.
pub fn resolve_fileset(store: &RevisionStore, revision: &Revision) -> Result<FileSet> {
    Resolver::new(store).resolve(revision)
}
