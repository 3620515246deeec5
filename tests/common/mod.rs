//! Shared utilities for synchronizer integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use proxy_control_plane::fragment::FileFragmentParser;
use proxy_control_plane::merge::DuplicatePolicy;
use proxy_control_plane::snapshot::{JsonTranslator, Publisher, SnapshotHandle};
use proxy_control_plane::sync::{SyncOptions, Synchronizer};

/// A self-contained service document: one cluster, one route, one endpoint.
///
/// `cluster` carries the availability suffix, e.g. `"billing-in"`.
pub fn service_doc(cluster: &str, path: &str) -> String {
    format!(
        r#"
[[clusters]]
name = "{cluster}"

[[routes]]
cluster = "{cluster}"
path = "{path}"
match = "prefix"

[[endpoints]]
cluster = "{cluster}"
address = "10.0.0.1"
port = 8080
"#
    )
}

/// Write `content` at `root/rel`, creating parent directories.
pub fn write_doc(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

pub fn synchronizer() -> Synchronizer {
    synchronizer_with(DuplicatePolicy::default(), SnapshotHandle::new())
}

pub fn synchronizer_with(policy: DuplicatePolicy, handle: SnapshotHandle) -> Synchronizer {
    let publisher = Publisher::new("test-node", policy, Box::new(JsonTranslator::new()), handle);
    Synchronizer::new(
        Box::new(FileFragmentParser::default()),
        publisher,
        SyncOptions::default(),
    )
}

/// Store keys in order.
pub fn store_paths(sync: &Synchronizer) -> Vec<PathBuf> {
    sync.store().paths().map(Path::to_path_buf).collect()
}
