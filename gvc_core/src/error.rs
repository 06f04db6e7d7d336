//! Error types for gvc_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using gvc_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during repository operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Revision document could not be encoded or decoded as JSON.
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Revision file is corrupted or invalid.
    #[error("Corrupted revision at {path}: {reason}")]
    CorruptedRevision { path: PathBuf, reason: String },

    /// Stored revision content does not hash to its file name.
    #[error("Hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// A different document is already stored under the same hash.
    #[error("Revision collision: {hash} already stored with different content")]
    RevisionCollision { hash: String },

    /// Revision not found in the store.
    #[error("Revision not found: {hash}")]
    RevisionNotFound { hash: String },

    /// Invalid hash format or encoding.
    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },

    /// Path could not be represented in a fileset.
    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    /// Repository is invalid or not initialized.
    #[error("Invalid repository at {path}: {reason}")]
    InvalidRepository { path: PathBuf, reason: String },

    /// No repository marker found from the start directory upwards.
    #[error("Not a gvc repository (or any parent up to /): {path}")]
    RepositoryNotFound { path: PathBuf },

    /// Repository already initialized.
    #[error("Repository already exists at {path}")]
    AlreadyInitialized { path: PathBuf },

    /// Revision fields violate the revision model.
    #[error("Invalid revision: {reason}")]
    InvalidRevision { reason: String },

    /// Commit attempted with no changes against the parent.
    #[error("Will not create a revision with no changes")]
    NoChanges,

    /// Commit attempted without a comment.
    #[error("A revision comment must not be empty")]
    EmptyComment,

    /// No current revision recorded.
    #[error("No current revision recorded in {path}")]
    NoCurrentRevision { path: PathBuf },

    /// Unsupported algorithm.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },
}

impl Error {
    /// Create a CorruptedRevision error.
    pub fn corrupted_revision(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptedRevision {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a HashMismatch error.
    pub fn hash_mismatch(
        path: impl Into<PathBuf>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Error::HashMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a RevisionCollision error.
    pub fn revision_collision(hash: impl Into<String>) -> Self {
        Error::RevisionCollision { hash: hash.into() }
    }

    /// Create an InvalidRevision error.
    pub fn invalid_revision(reason: impl Into<String>) -> Self {
        Error::InvalidRevision {
            reason: reason.into(),
        }
    }

    /// Create a RevisionNotFound error.
    pub fn revision_not_found(hash: impl Into<String>) -> Self {
        Error::RevisionNotFound { hash: hash.into() }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(reason: impl Into<String>) -> Self {
        Error::InvalidHash {
            reason: reason.into(),
        }
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidRepository error.
    pub fn invalid_repository(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidRepository {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a RepositoryNotFound error.
    pub fn repository_not_found(path: impl Into<PathBuf>) -> Self {
        Error::RepositoryNotFound { path: path.into() }
    }

    /// Create an AlreadyInitialized error.
    pub fn already_initialized(path: impl Into<PathBuf>) -> Self {
        Error::AlreadyInitialized { path: path.into() }
    }

    /// Create a NoCurrentRevision error.
    pub fn no_current_revision(path: impl Into<PathBuf>) -> Self {
        Error::NoCurrentRevision { path: path.into() }
    }

    /// Create an UnsupportedAlgorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Policy failures reject an operation without touching repository state.
    pub fn is_policy(&self) -> bool {
        matches!(
            self,
            Error::NoChanges | Error::EmptyComment | Error::AlreadyInitialized { .. }
        )
    }

    /// Whether the error indicates damaged or inconsistent stored data.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::Json { .. }
                | Error::CorruptedRevision { .. }
                | Error::HashMismatch { .. }
                | Error::RevisionCollision { .. }
                | Error::RevisionNotFound { .. }
                | Error::InvalidRepository { .. }
        )
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}
