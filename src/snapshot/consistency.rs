//! Referential checks run before a snapshot is served.
//!
//! # Design Decisions
//! - Returns every violation, not just the first
//! - Pure function: &Config → Result<(), ConsistencyError>

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::fragment::{Availability, Config, ListenerIdentity};

/// A single structural problem in a merged config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A route targets a cluster that does not exist.
    MissingCluster { route: String, cluster: String },
    /// A listener lists a route key that does not exist.
    MissingRoute { listener: ListenerIdentity, route: String },
    /// A listener serves a route its scope does not allow.
    ScopeMismatch {
        listener: ListenerIdentity,
        route: String,
        availability: Availability,
    },
    /// No listener serves the route.
    UnreachableRoute { route: String },
    /// A cluster has no endpoints.
    EmptyCluster { cluster: String },
    /// Endpoints were declared for a cluster that does not exist.
    OrphanEndpoints { cluster: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingCluster { route, cluster } => {
                write!(f, "route {route:?} targets unknown cluster {cluster:?}")
            }
            Violation::MissingRoute { listener, route } => {
                write!(f, "{listener} listener references unknown route {route:?}")
            }
            Violation::ScopeMismatch { listener, route, availability } => write!(
                f,
                "{listener} listener serves route {route:?} with availability {availability:?}"
            ),
            Violation::UnreachableRoute { route } => {
                write!(f, "route {route:?} is not served by any listener")
            }
            Violation::EmptyCluster { cluster } => write!(f, "cluster {cluster:?} has no endpoints"),
            Violation::OrphanEndpoints { cluster } => {
                write!(f, "endpoints declared for unknown cluster {cluster:?}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("inconsistent configuration: {}", join(.violations))]
pub struct ConsistencyError {
    pub violations: Vec<Violation>,
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check that every reference in `config` resolves.
pub fn check(config: &Config) -> Result<(), ConsistencyError> {
    let mut violations = Vec::new();

    for (key, route) in &config.routes {
        if !config.clusters.contains_key(&route.cluster) {
            violations.push(Violation::MissingCluster {
                route: key.clone(),
                cluster: route.cluster.clone(),
            });
        }
    }

    let mut served = BTreeSet::new();
    for listener in config.listeners.values() {
        for key in &listener.routes {
            let Some(route) = config.routes.get(key) else {
                violations.push(Violation::MissingRoute {
                    listener: listener.identity,
                    route: key.clone(),
                });
                continue;
            };
            served.insert(key.as_str());

            // Unresolved scopes cannot come out of merge; treat as both.
            let availability = route.availability.unwrap_or(Availability::Both);
            if !availability.serves(listener.identity) {
                violations.push(Violation::ScopeMismatch {
                    listener: listener.identity,
                    route: key.clone(),
                    availability,
                });
            }
        }
    }

    for key in config.routes.keys() {
        if !served.contains(key.as_str()) {
            violations.push(Violation::UnreachableRoute { route: key.clone() });
        }
    }

    for name in config.clusters.keys() {
        if config.endpoints.get(name).map_or(true, Vec::is_empty) {
            violations.push(Violation::EmptyCluster { cluster: name.clone() });
        }
    }

    for name in config.endpoints.keys() {
        if !config.clusters.contains_key(name) {
            violations.push(Violation::OrphanEndpoints { cluster: name.clone() });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ConsistencyError { violations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{Cluster, Endpoint, LbPolicy, Listener, MatchType, Route};

    fn consistent() -> Config {
        let mut config = Config::default();
        config.clusters.insert(
            "svc1-in".into(),
            Cluster {
                name: "svc1-in".into(),
                availability: Some(Availability::Internal),
                policy: LbPolicy::RoundRobin,
                health_check: None,
            },
        );
        config.endpoints.insert(
            "svc1-in".into(),
            vec![Endpoint {
                address: "10.0.0.1".into(),
                cluster: "svc1-in".into(),
                port: 443,
                region: "global".into(),
                weight: 0,
            }],
        );
        config.routes.insert(
            "svc1".into(),
            Route {
                availability: Some(Availability::Internal),
                cluster: "svc1-in".into(),
                path: "/svc1".into(),
                match_type: MatchType::Path,
            },
        );
        config.listeners.insert(
            ListenerIdentity::Internal,
            Listener {
                identity: ListenerIdentity::Internal,
                address: "0.0.0.0".into(),
                port: 443,
                common_name: "internal.example.com".into(),
                routes: vec!["svc1".into()],
            },
        );
        config
    }

    #[test]
    fn test_consistent_config_passes() {
        assert!(check(&consistent()).is_ok());
        assert!(check(&Config::default()).is_ok());
    }

    #[test]
    fn test_route_to_missing_cluster() {
        let mut config = consistent();
        config.routes.get_mut("svc1").unwrap().cluster = "ghost-in".into();

        let err = check(&config).unwrap_err();
        assert!(err.violations.contains(&Violation::MissingCluster {
            route: "svc1".into(),
            cluster: "ghost-in".into(),
        }));
    }

    #[test]
    fn test_listener_scope_mismatch() {
        let mut config = consistent();
        let mut external = config.listeners[&ListenerIdentity::Internal].clone();
        external.identity = ListenerIdentity::External;
        config.listeners.insert(ListenerIdentity::External, external);

        let err = check(&config).unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::ScopeMismatch {
                listener: ListenerIdentity::External,
                route: "svc1".into(),
                availability: Availability::Internal,
            }]
        );
    }

    #[test]
    fn test_collects_all_violations() {
        let mut config = consistent();
        config.listeners.clear();
        config.endpoints.clear();
        config.endpoints.insert("stray-ex".into(), Vec::new());

        let err = check(&config).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.to_string().contains("not served by any listener"));
        assert!(err.to_string().contains("svc1-in\" has no endpoints"));
    }
}
