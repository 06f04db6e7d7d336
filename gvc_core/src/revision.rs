//! Revision records and their canonical JSON document.
//!
//! A revision is identified by the digest of its own serialized document, so
//! serialization must be byte-for-byte reproducible: map keys and path lists
//! are sorted, timestamps carry whole seconds in UTC, and the document is
//! always pretty-printed with a trailing newline.

use crate::diff::FileSetDiff;
use crate::error::{Error, Result};
use crate::fileset::{FileSet, PathSet};
use crate::hash::{Algorithm, HASH_SIZE, Hash};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Marker written in place of a parent hash for the root revision.
pub const NO_PARENT: &str = "none";

/// An immutable, self-certifying record of a delta against its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    hash: Hash,
    parent: Option<Hash>,
    timestamp: DateTime<Utc>,
    comment: String,
    files_added: FileSet,
    files_removed: FileSet,
}

/// On-disk form of a revision. The revision's own hash is not part of it.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevisionDocument {
    parent: String,
    date: String,
    comment: String,
    files_added: BTreeMap<String, Vec<String>>,
    files_removed: BTreeMap<String, Vec<String>>,
}

impl Revision {
    /// Create the root revision of a chain from a full initial fileset.
    pub fn root(files: FileSet, comment: impl Into<String>, algorithm: Algorithm) -> Result<Self> {
        Self::build(
            None,
            files,
            FileSet::new(),
            comment.into(),
            now(),
            algorithm,
        )
    }

    /// Create a revision on top of `parent` recording `diff`.
    ///
    /// Refuses to create a revision that changes nothing.
    pub fn new(
        parent: Hash,
        diff: FileSetDiff,
        comment: impl Into<String>,
        algorithm: Algorithm,
    ) -> Result<Self> {
        Self::new_at(parent, diff, comment, now(), algorithm)
    }

    /// Like [`Revision::new`] with an explicit creation time.
    ///
    /// Sub-second precision is dropped so the stored date round-trips exactly.
    pub fn new_at(
        parent: Hash,
        diff: FileSetDiff,
        comment: impl Into<String>,
        timestamp: DateTime<Utc>,
        algorithm: Algorithm,
    ) -> Result<Self> {
        if diff.is_empty() {
            return Err(Error::NoChanges);
        }
        Self::build(
            Some(parent),
            diff.added,
            diff.removed,
            comment.into(),
            timestamp.trunc_subsecs(0),
            algorithm,
        )
    }

    fn build(
        parent: Option<Hash>,
        files_added: FileSet,
        files_removed: FileSet,
        comment: String,
        timestamp: DateTime<Utc>,
        algorithm: Algorithm,
    ) -> Result<Self> {
        if parent.is_none() && !files_removed.is_empty() {
            return Err(Error::invalid_revision(
                "a root revision cannot remove files",
            ));
        }

        let mut revision = Self {
            // Placeholder until the document is rendered below.
            hash: Hash::from_bytes([0; HASH_SIZE]),
            parent,
            timestamp,
            comment,
            files_added,
            files_removed,
        };
        let document = revision.to_document()?;
        revision.hash = algorithm.hash_bytes(document.as_bytes());
        Ok(revision)
    }

    /// Rebuild a revision from a stored document.
    ///
    /// `hash` is the identity the document was stored under; the caller is
    /// responsible for checking that the document actually hashes to it.
    /// `origin` is only used for error messages.
    pub fn from_document(hash: Hash, document: &str, origin: &Path) -> Result<Self> {
        let doc: RevisionDocument = serde_json::from_str(document)?;

        let parent = if doc.parent == NO_PARENT {
            None
        } else {
            Some(Hash::from_hex(&doc.parent).map_err(|e| {
                Error::corrupted_revision(origin, format!("invalid parent hash: {}", e))
            })?)
        };

        let timestamp = DateTime::parse_from_rfc3339(&doc.date)
            .map_err(|e| {
                Error::corrupted_revision(origin, format!("invalid date {:?}: {}", doc.date, e))
            })?
            .with_timezone(&Utc);

        let files_added = parse_fileset(doc.files_added, origin, "filesAdded")?;
        let files_removed = parse_fileset(doc.files_removed, origin, "filesRemoved")?;

        match parent {
            None if !files_removed.is_empty() => {
                return Err(Error::corrupted_revision(
                    origin,
                    "root revision lists removed files",
                ));
            }
            Some(_) if files_added.is_empty() && files_removed.is_empty() => {
                return Err(Error::corrupted_revision(
                    origin,
                    "revision records no changes",
                ));
            }
            _ => {}
        }

        Ok(Self {
            hash,
            parent,
            timestamp,
            comment: doc.comment,
            files_added,
            files_removed,
        })
    }

    /// Render the canonical document whose digest is this revision's hash.
    pub fn to_document(&self) -> Result<String> {
        let doc = RevisionDocument {
            parent: self
                .parent
                .map(|p| p.to_hex())
                .unwrap_or_else(|| NO_PARENT.to_string()),
            date: self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            comment: self.comment.clone(),
            files_added: render_fileset(&self.files_added),
            files_removed: render_fileset(&self.files_removed),
        };

        let mut text = serde_json::to_string_pretty(&doc)?;
        text.push('\n');
        Ok(text)
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Hash of the preceding revision, `None` for the root.
    pub fn parent(&self) -> Option<Hash> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn files_added(&self) -> &FileSet {
        &self.files_added
    }

    pub fn files_removed(&self) -> &FileSet {
        &self.files_removed
    }
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

fn render_fileset(set: &FileSet) -> BTreeMap<String, Vec<String>> {
    set.iter()
        .map(|(hash, paths)| (hash.to_hex(), paths.iter().cloned().collect()))
        .collect()
}

fn parse_fileset(
    raw: BTreeMap<String, Vec<String>>,
    origin: &Path,
    field: &str,
) -> Result<FileSet> {
    let mut set = FileSet::new();
    for (key, paths) in raw {
        let hash = Hash::from_hex(&key).map_err(|e| {
            Error::corrupted_revision(origin, format!("invalid digest in {}: {}", field, e))
        })?;
        let paths: PathSet = paths.into_iter().collect();
        set.insert_set(hash, paths);
    }

    if let Some(path) = set.duplicate_path() {
        return Err(Error::corrupted_revision(
            origin,
            format!("{} lists {} under more than one digest", field, path),
        ));
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use chrono::TimeZone;

    fn h(data: &str) -> Hash {
        Algorithm::Blake3.hash_bytes(data.as_bytes())
    }

    fn sample_files() -> FileSet {
        let mut set = FileSet::new();
        set.insert(h("hello"), "a.txt");
        set.insert(h("hello"), "b.txt");
        set.insert(h("code"), "src/main.rs");
        set
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_root_revision() {
        let files = sample_files();
        let root = Revision::root(files.clone(), "Initial revision.", Algorithm::Blake3).unwrap();

        assert!(root.is_root());
        assert_eq!(root.files_added(), &files);
        assert!(root.files_removed().is_empty());
        assert_eq!(root.comment(), "Initial revision.");
    }

    #[test]
    fn test_root_revision_of_empty_tree() {
        let root = Revision::root(FileSet::new(), "empty", Algorithm::Blake3).unwrap();
        assert!(root.files_added().is_empty());
    }

    #[test]
    fn test_hash_is_digest_of_document() {
        let root = Revision::root(sample_files(), "c", Algorithm::Sha256).unwrap();
        let document = root.to_document().unwrap();
        assert_eq!(root.hash(), Algorithm::Sha256.hash_bytes(document.as_bytes()));
    }

    #[test]
    fn test_no_changes_rejected() {
        let parent = h("parent");
        let result = Revision::new(parent, FileSetDiff::default(), "noop", Algorithm::Blake3);
        assert!(matches!(result, Err(Error::NoChanges)));
    }

    #[test]
    fn test_child_records_parent() {
        let root = Revision::root(sample_files(), "root", Algorithm::Blake3).unwrap();
        let mut next = sample_files();
        next.insert(h("new"), "new.txt");

        let child = Revision::new(
            root.hash(),
            diff(&sample_files(), &next),
            "add new",
            Algorithm::Blake3,
        )
        .unwrap();

        assert_eq!(child.parent(), Some(root.hash()));
        assert!(!child.is_root());
        assert_ne!(child.hash(), root.hash());
    }

    #[test]
    fn test_document_shape() {
        let mut removed = FileSet::new();
        removed.insert(h("old"), "dir/legacy.txt");
        let mut added = FileSet::new();
        added.insert(h("new"), "z.txt");
        added.insert(h("new"), "a.txt");

        let rev = Revision::new_at(
            h("p"),
            FileSetDiff { added, removed },
            "a \"quoted\" comment",
            fixed_time(),
            Algorithm::Blake3,
        )
        .unwrap();

        let document = rev.to_document().unwrap();
        let value: serde_json::Value = serde_json::from_str(&document).unwrap();

        assert_eq!(value["parent"], h("p").to_hex());
        assert_eq!(value["date"], "2024-05-01T12:30:00Z");
        assert_eq!(value["comment"], "a \"quoted\" comment");
        assert_eq!(
            value["filesAdded"][h("new").to_hex()],
            serde_json::json!(["a.txt", "z.txt"])
        );
        assert_eq!(
            value["filesRemoved"][h("old").to_hex()],
            serde_json::json!(["dir/legacy.txt"])
        );
        assert!(value.get("hash").is_none());
        assert!(document.ends_with("}\n"));
    }

    #[test]
    fn test_root_document_uses_none_marker() {
        let root = Revision::root(sample_files(), "root", Algorithm::Blake3).unwrap();
        let value: serde_json::Value = serde_json::from_str(&root.to_document().unwrap()).unwrap();
        assert_eq!(value["parent"], NO_PARENT);
        assert_eq!(value["filesRemoved"], serde_json::json!({}));
    }

    #[test]
    fn test_document_roundtrip() {
        let mut next = sample_files();
        next.remove(&h("code"));
        next.insert(h("hello"), "c.txt");

        let rev = Revision::new_at(
            h("parent"),
            diff(&sample_files(), &next),
            "rename and delete",
            fixed_time(),
            Algorithm::Blake3,
        )
        .unwrap();

        let document = rev.to_document().unwrap();
        let parsed = Revision::from_document(rev.hash(), &document, Path::new("r.json")).unwrap();

        assert_eq!(parsed, rev);
        assert_eq!(parsed.to_document().unwrap(), document);
    }

    #[test]
    fn test_subsecond_timestamp_truncated() {
        let precise = fixed_time() + chrono::Duration::milliseconds(750);
        let mut added = FileSet::new();
        added.insert(h("x"), "x");

        let rev = Revision::new_at(
            h("p"),
            FileSetDiff {
                added,
                removed: FileSet::new(),
            },
            "c",
            precise,
            Algorithm::Blake3,
        )
        .unwrap();
        assert_eq!(rev.timestamp(), fixed_time());
    }

    #[test]
    fn test_from_document_rejects_bad_fields() {
        let origin = Path::new("bad.json");
        let hash = h("whatever");
        let digest = h("content").to_hex();

        let bad_parent = r#"{"parent":"xyz","date":"2024-05-01T12:30:00Z","comment":"","filesAdded":{},"filesRemoved":{}}"#;
        assert!(matches!(
            Revision::from_document(hash, bad_parent, origin),
            Err(Error::CorruptedRevision { .. })
        ));

        let bad_date = r#"{"parent":"none","date":"May 1, 2024","comment":"","filesAdded":{},"filesRemoved":{}}"#;
        assert!(matches!(
            Revision::from_document(hash, bad_date, origin),
            Err(Error::CorruptedRevision { .. })
        ));

        let bad_digest = r#"{"parent":"none","date":"2024-05-01T12:30:00Z","comment":"","filesAdded":{"zz":["a"]},"filesRemoved":{}}"#;
        assert!(matches!(
            Revision::from_document(hash, bad_digest, origin),
            Err(Error::CorruptedRevision { .. })
        ));

        let root_removing = format!(
            r#"{{"parent":"none","date":"2024-05-01T12:30:00Z","comment":"","filesAdded":{{}},"filesRemoved":{{"{}":["a"]}}}}"#,
            digest
        );
        assert!(matches!(
            Revision::from_document(hash, &root_removing, origin),
            Err(Error::CorruptedRevision { .. })
        ));

        let missing_field = r#"{"parent":"none","date":"2024-05-01T12:30:00Z"}"#;
        assert!(matches!(
            Revision::from_document(hash, missing_field, origin),
            Err(Error::Json { .. })
        ));
    }

    #[test]
    fn test_from_document_ignores_unknown_fields() {
        let document = format!(
            r#"{{"parent":"none","date":"2024-05-01T12:30:00Z","comment":"c","author":"x","filesAdded":{{"{}":["a","a"]}},"filesRemoved":{{}}}}"#,
            h("a").to_hex()
        );
        let rev = Revision::from_document(h("id"), &document, Path::new("r.json")).unwrap();
        assert_eq!(rev.files_added().path_count(), 1);
        assert_eq!(rev.comment(), "c");
    }

    // Property-based tests
    use proptest::prelude::*;

    fn arb_fileset() -> impl Strategy<Value = FileSet> {
        // Keyed by path so no path lands under two digests.
        prop::collection::btree_map("[a-z]{1,6}(/[a-z]{1,6}){0,2}", 0u8..16, 0..8).prop_map(
            |entries| {
                entries
                    .into_iter()
                    .map(|(path, content)| (Algorithm::Blake3.hash_bytes(&[content]), path))
                    .collect()
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Parsing a serialized revision preserves every recorded field
        #[test]
        fn prop_document_roundtrip(
            added in arb_fileset(),
            removed in arb_fileset(),
            comment in ".{0,40}",
            secs in 0i64..4_000_000_000,
        ) {
            prop_assume!(!(added.is_empty() && removed.is_empty()));
            let timestamp = DateTime::from_timestamp(secs, 0).unwrap();
            let rev = Revision::new_at(
                h("parent"),
                FileSetDiff { added, removed },
                comment,
                timestamp,
                Algorithm::Blake3,
            )?;

            let document = rev.to_document()?;
            let parsed = Revision::from_document(rev.hash(), &document, Path::new("p.json"))?;
            prop_assert_eq!(parsed.files_added(), rev.files_added());
            prop_assert_eq!(parsed.files_removed(), rev.files_removed());
            prop_assert_eq!(parsed.parent(), rev.parent());
            prop_assert_eq!(parsed.comment(), rev.comment());
            prop_assert_eq!(parsed.timestamp(), rev.timestamp());
            prop_assert_eq!(
                Algorithm::Blake3.hash_bytes(parsed.to_document()?.as_bytes()),
                rev.hash()
            );
        }
    }
}
