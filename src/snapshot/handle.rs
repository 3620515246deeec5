//! Published snapshot and its shared handle.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tokio::sync::watch;

use crate::fragment::Config;
use crate::snapshot::translator::{ResourceKind, Resources};

/// A versioned, consistent set of translated resources.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub version: String,
    pub node_id: String,
    /// Unix seconds at publication.
    pub published_at: u64,
    /// Source documents that contributed to this snapshot.
    pub sources: Vec<PathBuf>,
    pub resources: Resources,
    pub config: Config,
}

impl Snapshot {
    /// Count of resources per kind.
    pub fn resource_counts(&self) -> BTreeMap<ResourceKind, usize> {
        self.resources.iter().map(|(kind, list)| (*kind, list.len())).collect()
    }
}

/// Shared, lock-free access to the current snapshot.
///
/// Only the publisher stores; any number of clones may load concurrently and
/// always observe a complete snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    current: Arc<ArcSwapOption<Snapshot>>,
    version_tx: Arc<watch::Sender<u64>>,
}

impl SnapshotHandle {
    pub fn new() -> Self {
        let (version_tx, _) = watch::channel(0);
        Self {
            current: Arc::new(ArcSwapOption::empty()),
            version_tx: Arc::new(version_tx),
        }
    }

    /// The currently served snapshot, if anything has been published.
    pub fn load(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// Receive the numeric version of every newly stored snapshot.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }

    pub(crate) fn store(&self, snapshot: Arc<Snapshot>, version: u64) {
        self.current.store(Some(snapshot));
        self.version_tx.send_replace(version);
    }
}

impl Default for SnapshotHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(version: u64) -> Arc<Snapshot> {
        Arc::new(Snapshot {
            version: version.to_string(),
            node_id: "node".into(),
            published_at: 0,
            sources: Vec::new(),
            resources: Resources::new(),
            config: Config::default(),
        })
    }

    #[test]
    fn test_clones_share_state() {
        let handle = SnapshotHandle::new();
        let reader = handle.clone();
        assert!(reader.load().is_none());

        handle.store(snapshot(1), 1);
        assert_eq!(reader.load().unwrap().version, "1");
    }

    #[test]
    fn test_resource_counts() {
        let mut snapshot = (*snapshot(1)).clone();
        snapshot
            .resources
            .insert(ResourceKind::Cluster, vec![serde_json::json!({ "name": "a-in" })]);
        snapshot.resources.insert(ResourceKind::Route, Vec::new());

        let counts = snapshot.resource_counts();
        assert_eq!(counts[&ResourceKind::Cluster], 1);
        assert_eq!(counts[&ResourceKind::Route], 0);
        assert!(!counts.contains_key(&ResourceKind::Listener));
    }

    #[tokio::test]
    async fn test_subscribers_see_new_versions() {
        let handle = SnapshotHandle::new();
        let mut rx = handle.subscribe();

        handle.store(snapshot(7), 7);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 7);
    }
}
