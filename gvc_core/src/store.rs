//! Revision storage and the current-revision pointer.

use crate::error::{Error, Result};
use crate::hash::{Algorithm, Hash};
use crate::revision::Revision;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extension of stored revision documents.
pub const REVISION_EXT: &str = "json";

/// Content-addressed store of revision documents.
///
/// Each revision lives at `revisions/<hash>.json` and is never rewritten.
/// The store also owns the `current_revision` pointer file.
#[derive(Debug, Clone)]
pub struct RevisionStore {
    revisions_dir: PathBuf,
    current_path: PathBuf,
    algorithm: Algorithm,
}

impl RevisionStore {
    /// Create a store rooted at a repository marker directory.
    ///
    /// Does not touch the filesystem.
    pub fn new<P: AsRef<Path>>(marker_dir: P, algorithm: Algorithm) -> Self {
        let marker_dir = marker_dir.as_ref();
        Self {
            revisions_dir: marker_dir.join("revisions"),
            current_path: marker_dir.join("current_revision"),
            algorithm,
        }
    }

    /// Directory holding the revision documents.
    pub fn revisions_dir(&self) -> &Path {
        &self.revisions_dir
    }

    /// Get the algorithm used to address revisions.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Get the path to a revision file given its hash.
    ///
    /// Returns: `revisions/{hash}.json`
    pub fn revision_path(&self, hash: &Hash) -> PathBuf {
        self.revisions_dir
            .join(format!("{}.{}", hash.to_hex(), REVISION_EXT))
    }

    pub fn exists(&self, hash: &Hash) -> bool {
        self.revision_path(hash).exists()
    }

    /// Persist a revision under its hash.
    ///
    /// Returns `true` if the document was written, `false` if an identical
    /// document was already stored. A different document under the same hash
    /// is reported as a collision and left untouched.
    pub fn save(&self, revision: &Revision) -> Result<bool> {
        let document = revision.to_document()?;
        let hash = self.algorithm.hash_bytes(document.as_bytes());
        if hash != revision.hash() {
            return Err(Error::invalid_revision(format!(
                "revision {} was not hashed with {}",
                revision.hash(),
                self.algorithm
            )));
        }

        let path = self.revision_path(&hash);
        if path.exists() {
            let existing = fs::read(&path)?;
            if existing == document.as_bytes() {
                debug!(hash = %hash.short(), "revision already stored");
                return Ok(false);
            }
            return Err(Error::revision_collision(hash.to_hex()));
        }

        self.write_atomic(&path, document.as_bytes())?;
        debug!(hash = %hash.short(), path = %path.display(), "stored revision");
        Ok(true)
    }

    /// Load a single revision by hash.
    ///
    /// The document is verified against the hash it is stored under. The
    /// parent is only referenced by hash, not loaded.
    pub fn load(&self, hash: &Hash) -> Result<Revision> {
        let path = self.revision_path(hash);
        if !path.exists() {
            return Err(Error::revision_not_found(hash.to_hex()));
        }

        let bytes = fs::read(&path)?;
        let actual = self.algorithm.hash_bytes(&bytes);
        if actual != *hash {
            return Err(Error::hash_mismatch(&path, hash.to_hex(), actual.to_hex()));
        }

        let document = std::str::from_utf8(&bytes)
            .map_err(|e| Error::corrupted_revision(&path, format!("not UTF-8: {}", e)))?;
        let revision = Revision::from_document(*hash, document, &path)?;
        debug!(hash = %hash.short(), "loaded revision");
        Ok(revision)
    }

    /// List the hashes of every stored revision, sorted.
    ///
    /// Files that are not named like revision documents are ignored.
    pub fn list(&self) -> Result<Vec<Hash>> {
        let mut hashes = Vec::new();

        if !self.revisions_dir.exists() {
            return Ok(hashes);
        }

        for entry in fs::read_dir(&self.revisions_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(REVISION_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && let Ok(hash) = Hash::from_hex(stem)
            {
                hashes.push(hash);
            }
        }

        hashes.sort();
        Ok(hashes)
    }

    /// Walk from `hash` back to the root, newest first.
    pub fn history(&self, hash: &Hash) -> Result<Vec<Revision>> {
        let mut chain = Vec::new();
        let mut next = Some(*hash);

        while let Some(current) = next {
            let revision = self.load(&current)?;
            next = revision.parent();
            chain.push(revision);
        }

        Ok(chain)
    }

    /// Record `revision` as the current revision.
    pub fn set_current(&self, revision: &Revision) -> Result<()> {
        self.set_current_hash(&revision.hash())
    }

    /// Record `hash` as the current revision.
    pub fn set_current_hash(&self, hash: &Hash) -> Result<()> {
        let line = format!("{}\n", hash.to_hex());
        self.write_atomic(&self.current_path, line.as_bytes())?;
        info!(hash = %hash, "current revision updated");
        Ok(())
    }

    /// Read the current revision pointer, `None` if it was never written.
    pub fn current(&self) -> Result<Option<Hash>> {
        if !self.current_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.current_path)?;
        let line = content.trim();
        if line.is_empty() {
            return Ok(None);
        }

        Hash::from_hex(line).map(Some).map_err(|e| {
            Error::invalid_repository(
                &self.current_path,
                format!("current_revision does not hold a hash: {}", e),
            )
        })
    }

    /// Load the revision the pointer refers to.
    pub fn load_current(&self) -> Result<Option<Revision>> {
        match self.current()? {
            Some(hash) => self.load(&hash).map(Some),
            None => Ok(None),
        }
    }

    /// Write a file atomically using tempfile.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| Error::invalid_path(path, "path has no parent directory"))?;
        fs::create_dir_all(dir)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
        temp_file.write_all(contents)?;
        temp_file.flush()?;

        // Persist atomically
        temp_file.persist(path)?;

        Ok(())
    }
}
