//! Fragment merging.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fragment::{AvailabilityError, Config, Fragment};

/// How conflicting cluster or route declarations are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The fragment with the greatest source path wins.
    #[default]
    LastWriterWins,
    /// Any conflicting redeclaration fails the merge.
    Reject,
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("{source} (declared in {})", .path.display())]
    Availability {
        path: PathBuf,
        #[source]
        source: AvailabilityError,
    },

    #[error("{kind} {name:?} declared differently in {} and {}", .first.display(), .second.display())]
    Duplicate {
        kind: &'static str,
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Merge fragments, in iteration order, into one [`Config`].
///
/// - listeners are joined by identity and their route lists unioned
/// - clusters and routes are keyed by name, conflicts resolved by `policy`
/// - endpoint lists are concatenated per cluster
pub fn merge<'a, I>(fragments: I, policy: DuplicatePolicy) -> Result<Config, MergeError>
where
    I: IntoIterator<Item = (&'a Path, &'a Fragment)>,
{
    let mut config = Config::default();
    let mut cluster_origin: BTreeMap<String, &Path> = BTreeMap::new();
    let mut route_origin: BTreeMap<String, &Path> = BTreeMap::new();

    for (path, fragment) in fragments {
        for (identity, listener) in &fragment.listeners {
            let merged = config
                .listeners
                .entry(*identity)
                .or_insert_with(|| {
                    let mut first = listener.clone();
                    first.routes.clear();
                    first
                });
            for route in &listener.routes {
                if !merged.routes.contains(route) {
                    merged.routes.push(route.clone());
                }
            }
        }

        for (name, cluster) in &fragment.clusters {
            let mut cluster = cluster.clone();
            cluster.availability = Some(cluster.scope().map_err(|source| MergeError::Availability {
                path: path.to_path_buf(),
                source,
            })?);
            insert_named(&mut config.clusters, &mut cluster_origin, "cluster", name, cluster, path, policy)?;
        }

        for (key, route) in &fragment.routes {
            let mut route = route.clone();
            route.availability = Some(route.scope().map_err(|source| MergeError::Availability {
                path: path.to_path_buf(),
                source,
            })?);
            insert_named(&mut config.routes, &mut route_origin, "route", key, route, path, policy)?;
        }

        for (cluster, endpoints) in &fragment.endpoints {
            config
                .endpoints
                .entry(cluster.clone())
                .or_default()
                .extend(endpoints.iter().cloned());
        }
    }

    Ok(config)
}

fn insert_named<'a, T: PartialEq>(
    target: &mut BTreeMap<String, T>,
    origins: &mut BTreeMap<String, &'a Path>,
    kind: &'static str,
    name: &str,
    value: T,
    path: &'a Path,
    policy: DuplicatePolicy,
) -> Result<(), MergeError> {
    match target.entry(name.to_string()) {
        Entry::Vacant(e) => {
            e.insert(value);
        }
        Entry::Occupied(mut e) => {
            if *e.get() == value {
                return Ok(());
            }
            let first = origins.get(name).copied().unwrap_or(path);
            match policy {
                DuplicatePolicy::Reject => {
                    return Err(MergeError::Duplicate {
                        kind,
                        name: name.to_string(),
                        first: first.to_path_buf(),
                        second: path.to_path_buf(),
                    });
                }
                DuplicatePolicy::LastWriterWins => {
                    tracing::warn!(
                        kind,
                        name,
                        overridden = %first.display(),
                        winner = %path.display(),
                        "Conflicting declaration overridden"
                    );
                    e.insert(value);
                }
            }
        }
    }
    origins.insert(name.to_string(), path);
    Ok(())
}
