//! Snapshot publication.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::fragment::Config;
use crate::merge::{merge, DuplicatePolicy, MergeError};
use crate::observability::metrics;
use crate::snapshot::consistency::{self, ConsistencyError};
use crate::snapshot::handle::{Snapshot, SnapshotHandle};
use crate::snapshot::translator::{ResourceTranslator, TranslationError};
use crate::store::FragmentStore;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    #[error("translation failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("version {version} rejected: {source}")]
    Inconsistent {
        version: u64,
        #[source]
        source: ConsistencyError,
    },
}

/// Versions merged configs and swaps them into a [`SnapshotHandle`].
///
/// Versions start at 1 and are consumed by every attempt that gets past
/// translation, so a rejected version is never reissued.
pub struct Publisher {
    node_id: String,
    policy: DuplicatePolicy,
    translator: Box<dyn ResourceTranslator>,
    handle: SnapshotHandle,
    version: u64,
}

impl Publisher {
    pub fn new(
        node_id: impl Into<String>,
        policy: DuplicatePolicy,
        translator: Box<dyn ResourceTranslator>,
        handle: SnapshotHandle,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            policy,
            translator,
            handle,
            version: 0,
        }
    }

    /// Handle readers use to load published snapshots.
    pub fn handle(&self) -> &SnapshotHandle {
        &self.handle
    }

    /// Last version handed out, whether or not it was served.
    pub fn last_version(&self) -> u64 {
        self.version
    }

    /// Merge every fragment in `store` and publish the result.
    pub fn publish_store(&mut self, store: &FragmentStore) -> Result<Arc<Snapshot>, PublishError> {
        let config = merge(store.fragments(), self.policy).inspect_err(|e| {
            metrics::record_publish("merge_error");
            tracing::error!(error = %e, "Merge failed, keeping current snapshot");
        })?;
        let sources = store.paths().map(PathBuf::from).collect();
        self.publish(config, sources)
    }

    /// Publish an already merged config.
    pub fn publish(&mut self, config: Config, sources: Vec<PathBuf>) -> Result<Arc<Snapshot>, PublishError> {
        let resources = self.translator.translate(&config).inspect_err(|e| {
            metrics::record_publish("translation_error");
            tracing::error!(error = %e, "Translation failed, keeping current snapshot");
        })?;

        self.version += 1;
        let version = self.version;

        if let Err(source) = consistency::check(&config) {
            metrics::record_publish("inconsistent");
            tracing::error!(version, error = %source, "Snapshot inconsistent, keeping current snapshot");
            return Err(PublishError::Inconsistent { version, source });
        }

        let snapshot = Arc::new(Snapshot {
            version: version.to_string(),
            node_id: self.node_id.clone(),
            published_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            sources,
            resources,
            config,
        });

        self.handle.store(snapshot.clone(), version);
        metrics::record_publish("ok");
        metrics::record_snapshot_version(version);

        tracing::info!(
            version,
            node_id = %self.node_id,
            sources = snapshot.sources.len(),
            clusters = snapshot.config.clusters.len(),
            routes = snapshot.config.routes.len(),
            "Snapshot published"
        );
        Ok(snapshot)
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("node_id", &self.node_id)
            .field("policy", &self.policy)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{
        Availability, Cluster, Endpoint, Fragment, LbPolicy, Listener, ListenerIdentity, MatchType, Route,
    };
    use crate::snapshot::translator::{JsonTranslator, Resources};

    fn publisher() -> Publisher {
        Publisher::new("test-node", DuplicatePolicy::Reject, Box::new(JsonTranslator::new()), SnapshotHandle::new())
    }

    fn service(name: &str, cluster: &str) -> Fragment {
        let mut fragment = Fragment::new();
        fragment.clusters.insert(
            cluster.into(),
            Cluster {
                name: cluster.into(),
                availability: None,
                policy: LbPolicy::RoundRobin,
                health_check: None,
            },
        );
        fragment.endpoints.insert(
            cluster.into(),
            vec![Endpoint {
                address: "10.0.0.1".into(),
                cluster: cluster.into(),
                port: 443,
                region: "global".into(),
                weight: 0,
            }],
        );
        fragment.routes.insert(
            name.into(),
            Route {
                availability: None,
                cluster: cluster.into(),
                path: format!("/{name}"),
                match_type: MatchType::Prefix,
            },
        );
        let scope = Availability::from_name_suffix(cluster).unwrap();
        for identity in scope.listeners() {
            fragment.listeners.insert(
                identity,
                Listener {
                    identity,
                    address: "0.0.0.0".into(),
                    port: 443,
                    common_name: "example.com".into(),
                    routes: vec![name.into()],
                },
            );
        }
        fragment
    }

    struct FailingTranslator;

    impl ResourceTranslator for FailingTranslator {
        fn translate(&self, _config: &Config) -> Result<Resources, TranslationError> {
            Err(TranslationError::Unsupported("no data plane".into()))
        }
    }

    #[test]
    fn test_versions_increase() {
        let mut publisher = publisher();
        let mut store = FragmentStore::new();
        store.put("/a/svc1.toml", service("svc1", "svc1-in"));

        let first = publisher.publish_store(&store).unwrap();
        store.put("/a/svc2.toml", service("svc2", "svc2-ex"));
        let second = publisher.publish_store(&store).unwrap();

        assert_eq!(first.version, "1");
        assert_eq!(second.version, "2");
        assert_eq!(second.sources.len(), 2);
        assert_eq!(publisher.handle().load().unwrap().version, "2");
    }

    #[test]
    fn test_inconsistent_config_keeps_previous_snapshot() {
        let mut publisher = publisher();
        let mut store = FragmentStore::new();
        store.put("/a/svc1.toml", service("svc1", "svc1-in"));
        publisher.publish_store(&store).unwrap();

        let mut broken = service("svc2", "svc2-in");
        broken.clusters.clear();
        broken.endpoints.clear();
        store.put("/a/svc2.toml", broken);

        let err = publisher.publish_store(&store).unwrap_err();
        assert!(matches!(err, PublishError::Inconsistent { version: 2, .. }));
        assert_eq!(publisher.handle().load().unwrap().version, "1");

        // The rejected version is burned.
        store.remove(std::path::Path::new("/a/svc2.toml"));
        assert_eq!(publisher.publish_store(&store).unwrap().version, "3");
    }

    #[test]
    fn test_translation_failure_consumes_no_version() {
        let handle = SnapshotHandle::new();
        let mut publisher = Publisher::new("n", DuplicatePolicy::Reject, Box::new(FailingTranslator), handle.clone());

        let err = publisher.publish(Config::default(), Vec::new()).unwrap_err();
        assert!(matches!(err, PublishError::Translation(_)));
        assert_eq!(publisher.last_version(), 0);
        assert!(handle.load().is_none());
    }

    #[test]
    fn test_merge_failure_is_reported() {
        let mut publisher = publisher();
        let mut store = FragmentStore::new();
        store.put("/a/one.toml", service("svc", "svc-in"));
        let mut other = service("svc", "svc-in");
        other.routes.get_mut("svc").unwrap().path = "/elsewhere".into();
        store.put("/a/two.toml", other);

        let err = publisher.publish_store(&store).unwrap_err();
        assert!(matches!(err, PublishError::Merge(MergeError::Duplicate { .. })));
        assert_eq!(publisher.last_version(), 0);
    }
}
