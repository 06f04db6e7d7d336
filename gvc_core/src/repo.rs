//! Repository discovery, bootstrap and the commit workflow.

use crate::diff::{FileSetDiff, diff};
use crate::error::{Error, Result};
use crate::fileset::FileSet;
use crate::hash::Algorithm;
use crate::resolve::Resolver;
use crate::revision::Revision;
use crate::scan::scan;
use crate::store::RevisionStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the directory marking a repository root.
pub const MARKER_DIR: &str = ".gvc";

/// Comment recorded on the root revision by [`Repository::init`].
pub const INITIAL_COMMENT: &str = "Initial revision.";

const CONFIG_VERSION: &str = "1";

/// A working tree together with its `.gvc` metadata.
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    algorithm: Algorithm,
    store: RevisionStore,
}

impl Repository {
    /// Initialize a new repository in `root`.
    ///
    /// Scans the tree into the root revision, then creates the directory
    /// structure:
    /// - `.gvc/revisions/` for revision documents
    /// - `.gvc/filestore/` (reserved)
    /// - `.gvc/config` with version and algorithm
    ///
    /// and points `current_revision` at the root revision. Nothing is
    /// created if the scan fails.
    pub fn init<P: AsRef<Path>>(root: P, algorithm: Algorithm) -> Result<(Self, Revision)> {
        let root = root.as_ref().to_path_buf();
        let marker = root.join(MARKER_DIR);
        if marker.exists() {
            return Err(Error::already_initialized(&root));
        }

        let files = scan(&root, algorithm)?;
        let revision = Revision::root(files, INITIAL_COMMENT, algorithm)?;

        fs::create_dir_all(marker.join("revisions"))?;
        fs::create_dir_all(marker.join("filestore"))?;

        let config_content = format!("version={}\nalgo={}\n", CONFIG_VERSION, algorithm.as_str());
        fs::write(marker.join("config"), config_content)?;

        let repo = Self {
            store: RevisionStore::new(&marker, algorithm),
            root,
            algorithm,
        };

        repo.store.save(&revision)?;
        repo.store.set_current(&revision)?;

        info!(
            root = %repo.root.display(),
            algorithm = %algorithm,
            revision = %revision.hash(),
            "initialized repository"
        );

        Ok((repo, revision))
    }

    /// Open an existing repository whose root is `root`.
    ///
    /// Reads the configuration and recreates missing `revisions`/`filestore`
    /// directories.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let marker = root.join(MARKER_DIR);

        if !marker.is_dir() {
            return Err(Error::invalid_repository(
                &root,
                format!("{} directory not found", MARKER_DIR),
            ));
        }

        let config_path = marker.join("config");
        if !config_path.exists() {
            return Err(Error::invalid_repository(&root, "config file not found"));
        }

        let config_content = fs::read_to_string(&config_path)?;
        let algorithm = Self::parse_config(&config_path, &config_content)?;

        fs::create_dir_all(marker.join("revisions"))?;
        fs::create_dir_all(marker.join("filestore"))?;

        debug!(root = %root.display(), algorithm = %algorithm, "opened repository");

        Ok(Self {
            store: RevisionStore::new(&marker, algorithm),
            root,
            algorithm,
        })
    }

    /// Open the repository containing `start`, searching parent directories.
    pub fn discover<P: AsRef<Path>>(start: P) -> Result<Self> {
        let start = start.as_ref();
        match find_root(start)? {
            Some(root) => Self::open(root),
            None => Err(Error::repository_not_found(start)),
        }
    }

    /// Parse the config file to extract the algorithm.
    fn parse_config(path: &Path, content: &str) -> Result<Algorithm> {
        let mut version = None;
        let mut algo = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "version" => version = Some(value.trim()),
                    "algo" => algo = Some(value.trim()),
                    _ => {}
                }
            }
        }

        if version != Some(CONFIG_VERSION) {
            return Err(Error::invalid_repository(
                path,
                format!("unsupported config version: {:?}", version),
            ));
        }

        let algo_str =
            algo.ok_or_else(|| Error::invalid_repository(path, "missing algo in config"))?;
        Algorithm::parse(algo_str).map_err(|e| Error::invalid_repository(path, e.to_string()))
    }

    /// Get the root directory of the working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.gvc` directory.
    pub fn marker_dir(&self) -> PathBuf {
        self.root.join(MARKER_DIR)
    }

    /// Reserved directory for stored file contents.
    pub fn filestore_dir(&self) -> PathBuf {
        self.marker_dir().join("filestore")
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn store(&self) -> &RevisionStore {
        &self.store
    }

    /// A resolver over this repository's revisions.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.store)
    }

    /// Snapshot the working tree.
    pub fn scan(&self) -> Result<FileSet> {
        scan(&self.root, self.algorithm)
    }

    /// Load the revision `current_revision` points at.
    pub fn current(&self) -> Result<Revision> {
        self.store
            .load_current()?
            .ok_or_else(|| Error::no_current_revision(self.marker_dir()))
    }

    /// Full fileset at `revision`.
    pub fn resolve(&self, revision: &Revision) -> Result<FileSet> {
        self.resolver().resolve(revision)
    }

    /// Changes in the working tree relative to the current revision.
    ///
    /// Nothing is written.
    pub fn status(&self) -> Result<FileSetDiff> {
        let current = self.current()?;
        let committed = self.resolve(&current)?;
        let working = self.scan()?;
        Ok(diff(&committed, &working))
    }

    /// Record the working tree as a new revision on top of the current one.
    ///
    /// Fails without writing anything if the comment is empty or nothing
    /// changed. The revision file is written before the pointer is moved, so
    /// an interruption in between leaves a stored but uncommitted revision.
    pub fn commit(&self, comment: &str) -> Result<Revision> {
        if comment.trim().is_empty() {
            return Err(Error::EmptyComment);
        }

        let current = self.current()?;
        let committed = self.resolve(&current)?;
        let working = self.scan()?;
        let delta = diff(&committed, &working);

        let revision = Revision::new(current.hash(), delta, comment, self.algorithm)?;
        self.store.save(&revision)?;
        self.store.set_current(&revision)?;

        info!(
            revision = %revision.hash(),
            parent = %current.hash(),
            added = revision.files_added().len(),
            removed = revision.files_removed().len(),
            "committed revision"
        );

        Ok(revision)
    }

    /// Revisions from the current one back to the root, newest first.
    pub fn log(&self) -> Result<Vec<Revision>> {
        match self.store.current()? {
            Some(hash) => self.store.history(&hash),
            None => Err(Error::no_current_revision(self.marker_dir())),
        }
    }
}

/// Search `start` and its ancestors for a directory containing `.gvc`.
pub fn find_root(start: &Path) -> Result<Option<PathBuf>> {
    let start = fs::canonicalize(start)?;
    Ok(start
        .ancestors()
        .find(|dir| dir.join(MARKER_DIR).is_dir())
        .map(Path::to_path_buf))
}
