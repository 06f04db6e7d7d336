//! Filesets: content digest to the set of relative paths sharing it.

use crate::hash::Hash;
use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Separator used for every path stored in a fileset.
pub const PATH_SEPARATOR: char = '/';

/// Relative paths sharing one digest.
pub type PathSet = BTreeSet<String>;

/// A snapshot of a tree: digest to the paths holding that content.
///
/// Paths are relative to the tree root and always use `/`. Both levels are
/// ordered so that iteration (and therefore serialization) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: BTreeMap<Hash, PathSet>,
}

impl FileSet {
    /// Create an empty fileset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path` under `hash`, creating the path set if absent.
    ///
    /// Returns false if the path was already recorded under this hash.
    pub fn insert(&mut self, hash: Hash, path: impl Into<String>) -> bool {
        self.entries.entry(hash).or_default().insert(path.into())
    }

    /// Insert a whole path set under `hash`, replacing any existing one.
    pub fn insert_set(&mut self, hash: Hash, paths: PathSet) -> Option<PathSet> {
        self.entries.insert(hash, paths)
    }

    /// Remove a digest and all of its paths.
    pub fn remove(&mut self, hash: &Hash) -> Option<PathSet> {
        self.entries.remove(hash)
    }

    /// Paths recorded under `hash`.
    pub fn get(&self, hash: &Hash) -> Option<&PathSet> {
        self.entries.get(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.entries.contains_key(hash)
    }

    /// Number of distinct digests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of paths across all digests.
    pub fn path_count(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    /// Iterate digests in order.
    pub fn hashes(&self) -> impl Iterator<Item = &Hash> {
        self.entries.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Hash, PathSet> {
        self.entries.iter()
    }

    /// Find the digest a path is recorded under.
    pub fn hash_of(&self, path: &str) -> Option<&Hash> {
        self.entries
            .iter()
            .find(|(_, paths)| paths.contains(path))
            .map(|(hash, _)| hash)
    }

    /// Every path mapped to its digest, sorted by path.
    pub fn by_path(&self) -> BTreeMap<&str, &Hash> {
        self.entries
            .iter()
            .flat_map(|(hash, paths)| paths.iter().map(move |p| (p.as_str(), hash)))
            .collect()
    }

    /// Returns the first path found under more than one digest, if any.
    ///
    /// A well-formed snapshot never records the same path with two contents.
    pub fn duplicate_path(&self) -> Option<&str> {
        let mut seen: HashMap<&str, &Hash> = HashMap::new();
        for (hash, paths) in &self.entries {
            for path in paths {
                if let Some(previous) = seen.insert(path.as_str(), hash)
                    && previous != hash
                {
                    return Some(path.as_str());
                }
            }
        }
        None
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = (&'a Hash, &'a PathSet);
    type IntoIter = btree_map::Iter<'a, Hash, PathSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for FileSet {
    type Item = (Hash, PathSet);
    type IntoIter = btree_map::IntoIter<Hash, PathSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(Hash, PathSet)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (Hash, PathSet)>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for (hash, paths) in iter {
            set.entries.entry(hash).or_default().extend(paths);
        }
        set
    }
}

impl FromIterator<(Hash, String)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (Hash, String)>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for (hash, path) in iter {
            set.insert(hash, path);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Algorithm;

    fn h(data: &str) -> Hash {
        Algorithm::Blake3.hash_bytes(data.as_bytes())
    }

    #[test]
    fn test_insert_groups_paths_by_hash() {
        let mut set = FileSet::new();
        assert!(set.insert(h("hello"), "a.txt"));
        assert!(set.insert(h("hello"), "b.txt"));
        assert!(!set.insert(h("hello"), "a.txt"));
        set.insert(h("other"), "c.txt");

        assert_eq!(set.len(), 2);
        assert_eq!(set.path_count(), 3);
        let paths: Vec<_> = set.get(&h("hello")).unwrap().iter().cloned().collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_remove_and_contains() {
        let mut set: FileSet = [(h("x"), "f".to_string())].into_iter().collect();
        assert!(set.contains(&h("x")));
        assert!(set.remove(&h("x")).is_some());
        assert!(set.remove(&h("x")).is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn test_hash_of_and_by_path() {
        let mut set = FileSet::new();
        set.insert(h("1"), "dir/one");
        set.insert(h("2"), "two");

        assert_eq!(set.hash_of("dir/one"), Some(&h("1")));
        assert_eq!(set.hash_of("missing"), None);

        let by_path = set.by_path();
        assert_eq!(by_path.keys().copied().collect::<Vec<_>>(), vec!["dir/one", "two"]);
    }

    #[test]
    fn test_duplicate_path_detection() {
        let mut set = FileSet::new();
        set.insert(h("1"), "same");
        set.insert(h("2"), "other");
        assert_eq!(set.duplicate_path(), None);

        set.insert(h("2"), "same");
        assert_eq!(set.duplicate_path(), Some("same"));
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let mut a = FileSet::new();
        a.insert(h("1"), "x");
        a.insert(h("2"), "y");
        a.insert(h("1"), "z");

        let mut b = FileSet::new();
        b.insert(h("1"), "z");
        b.insert(h("2"), "y");
        b.insert(h("1"), "x");

        assert_eq!(a, b);
    }
}
