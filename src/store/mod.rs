//! Fragment store keyed by source path.
//!
//! # Responsibilities
//! - Hold the latest fragment parsed from each source document
//! - Remove a single document or every document below a directory
//!
//! # Design Decisions
//! - Keys are ordered, so iteration (and therefore merge order) follows
//!   path order
//! - Fragments are replaced whole; there is no partial update
//! - Prefix removal compares path components, so `/a` never matches `/ab`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::fragment::Fragment;

#[derive(Debug, Default)]
pub struct FragmentStore {
    fragments: BTreeMap<PathBuf, Fragment>,
}

impl FragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the fragment stored at `path`.
    pub fn put(&mut self, path: impl Into<PathBuf>, fragment: Fragment) {
        self.fragments.insert(path.into(), fragment);
    }

    /// Remove `path`, or everything under it when it is not itself a key.
    ///
    /// Returns the removed keys. Removing an absent path is a no-op.
    pub fn remove(&mut self, path: &Path) -> Vec<PathBuf> {
        if self.fragments.remove(path).is_some() {
            return vec![path.to_path_buf()];
        }

        let descendants: Vec<PathBuf> = self
            .fragments
            .keys()
            .filter(|key| key.as_path() != path && key.starts_with(path))
            .cloned()
            .collect();

        for key in &descendants {
            self.fragments.remove(key);
        }
        descendants
    }

    pub fn get(&self, path: &Path) -> Option<&Fragment> {
        self.fragments.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.fragments.contains_key(path)
    }

    /// Stored fragments with their source paths, in path order.
    pub fn fragments(&self) -> impl Iterator<Item = (&Path, &Fragment)> {
        self.fragments.iter().map(|(path, fragment)| (path.as_path(), fragment))
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.fragments.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(paths: &[&str]) -> FragmentStore {
        let mut store = FragmentStore::new();
        for path in paths {
            store.put(*path, Fragment::new());
        }
        store
    }

    #[test]
    fn test_put_replaces() {
        let mut store = FragmentStore::new();
        store.put("/a/one.toml", Fragment::new());
        store.put("/a/one.toml", Fragment::new());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_exact() {
        let mut store = store_with(&["/a/one.toml", "/a/two.toml"]);
        let removed = store.remove(Path::new("/a/one.toml"));
        assert_eq!(removed, vec![PathBuf::from("/a/one.toml")]);
        assert!(store.contains(Path::new("/a/two.toml")));
    }

    #[test]
    fn test_remove_directory_prefix() {
        let mut store = store_with(&["/a/one.toml", "/a/sub/two.toml", "/ab/three.toml", "/b/four.toml"]);
        let removed = store.remove(Path::new("/a"));

        assert_eq!(removed, vec![PathBuf::from("/a/one.toml"), PathBuf::from("/a/sub/two.toml")]);
        let left: Vec<_> = store.paths().collect();
        assert_eq!(left, vec![Path::new("/ab/three.toml"), Path::new("/b/four.toml")]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut store = store_with(&["/a/one.toml"]);
        assert!(store.remove(Path::new("/missing")).is_empty());
        assert_eq!(store.len(), 1);
    }
}
