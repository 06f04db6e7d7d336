//! # GVC Core
//!
//! Snapshots of a directory tree as content-addressed filesets, recorded as a
//! linear chain of immutable, self-certifying revisions.
//!
//! A fileset maps each content digest to the set of relative paths holding
//! that content. Every revision stores only the delta (`filesAdded`,
//! `filesRemoved`) against its parent and is stored under the digest of its
//! own JSON document. The full fileset at any revision is rebuilt by
//! replaying deltas from the root.
//!
//! ## Example
//!
//! ```no_run
//! use gvc_core::{Algorithm, Repository};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Record the current tree as the root revision
//! let (repo, root) = Repository::init("./project", Algorithm::Blake3)?;
//! println!("root revision {}", root.hash());
//!
//! // ... edit files ...
//!
//! // Record the changes on top of the current revision
//! let revision = repo.commit("Describe the change")?;
//!
//! // Rebuild the full fileset at that revision
//! let files = repo.resolve(&revision)?;
//! for (hash, paths) in &files {
//!     println!("{}: {:?}", hash, paths);
//! }
//! # Ok(())
//! # }
//! ```

mod diff;
mod error;
mod fileset;
mod hash;
mod repo;
mod resolve;
mod revision;
mod scan;
mod store;

pub use diff::{ApplyStats, FileSetDiff, apply_diff, diff};
pub use error::{Error, Result};
pub use fileset::{FileSet, PATH_SEPARATOR, PathSet};
pub use hash::{Algorithm, HASH_SIZE, Hash};
pub use repo::{INITIAL_COMMENT, MARKER_DIR, Repository, find_root};
pub use resolve::{Resolver, resolve_fileset};
pub use revision::{NO_PARENT, Revision};
pub use scan::{relative_path, scan};
pub use store::{REVISION_EXT, RevisionStore};
