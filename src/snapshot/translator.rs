//! Translation of a merged [`Config`] into data-plane resources.
//!
//! # Responsibilities
//! - Render listeners, clusters, route tables and endpoint assignments
//! - Group the rendered resources by kind
//!
//! # Design Decisions
//! - Translation is total over a consistent config: listeners naming an
//!   unknown route simply render without it, the consistency check rejects
//!   such configs before they are served
//! - Endpoints are grouped into one locality per region

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::fragment::{Cluster, Config, Endpoint, HealthCheckProtocol, LbPolicy, ListenerIdentity, MatchType};

/// Data-plane resource kinds, in the order a proxy should apply them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cluster,
    Endpoint,
    Listener,
    Route,
}

impl ResourceKind {
    pub fn type_url(&self) -> &'static str {
        match self {
            ResourceKind::Cluster => "type.googleapis.com/envoy.config.cluster.v3.Cluster",
            ResourceKind::Endpoint => "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment",
            ResourceKind::Listener => "type.googleapis.com/envoy.config.listener.v3.Listener",
            ResourceKind::Route => "type.googleapis.com/envoy.config.route.v3.RouteConfiguration",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Cluster => "cluster",
            ResourceKind::Endpoint => "endpoint",
            ResourceKind::Listener => "listener",
            ResourceKind::Route => "route",
        };
        f.write_str(name)
    }
}

/// Rendered resources grouped by kind.
pub type Resources = BTreeMap<ResourceKind, Vec<Value>>;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("failed to render {kind} {name:?}: {source}")]
    Render {
        kind: ResourceKind,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Unsupported(String),
}

/// Converts a merged config into data-plane resources.
pub trait ResourceTranslator: Send + Sync {
    fn translate(&self, config: &Config) -> Result<Resources, TranslationError>;
}

/// Default translator producing JSON resources shaped after the xDS types
/// named by [`ResourceKind::type_url`].
#[derive(Debug, Clone, Default)]
pub struct JsonTranslator;

impl JsonTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Name of the route table served by a listener.
    pub fn route_config_name(identity: ListenerIdentity) -> String {
        format!("{}-routes", identity)
    }

    fn listeners(&self, config: &Config) -> Vec<Value> {
        config
            .listeners
            .values()
            .map(|l| {
                json!({
                    "name": l.identity.as_str(),
                    "address": {
                        "socket_address": { "address": l.address, "port_value": l.port }
                    },
                    "common_name": l.common_name,
                    "route_config_name": Self::route_config_name(l.identity),
                })
            })
            .collect()
    }

    fn clusters(&self, config: &Config) -> Result<Vec<Value>, TranslationError> {
        config.clusters.values().map(|c| self.cluster(c)).collect()
    }

    fn cluster(&self, cluster: &Cluster) -> Result<Value, TranslationError> {
        let mut value = json!({
            "name": cluster.name,
            "type": "EDS",
            "lb_policy": lb_policy_name(cluster.policy),
        });

        if let Some(check) = &cluster.health_check {
            let mut rendered = serde_json::to_value(check).map_err(|source| TranslationError::Render {
                kind: ResourceKind::Cluster,
                name: cluster.name.clone(),
                source,
            })?;
            if check.protocol == HealthCheckProtocol::Http && check.path.is_none() {
                return Err(TranslationError::Unsupported(format!(
                    "HTTP health check of cluster {:?} has no path",
                    cluster.name
                )));
            }
            if let Value::Object(map) = &mut rendered {
                map.insert("protocol".into(), json!(health_protocol_name(check.protocol)));
            }
            value["health_checks"] = json!([rendered]);
        }

        Ok(value)
    }

    fn routes(&self, config: &Config) -> Vec<Value> {
        ListenerIdentity::ALL
            .into_iter()
            .map(|identity| {
                let routes: Vec<Value> = config
                    .listeners
                    .get(&identity)
                    .into_iter()
                    .flat_map(|l| l.routes.iter())
                    .filter_map(|key| config.routes.get(key))
                    .map(|r| {
                        let matcher = match r.match_type {
                            MatchType::Path => json!({ "path": r.path }),
                            MatchType::Prefix => json!({ "prefix": r.path }),
                        };
                        json!({ "match": matcher, "route": { "cluster": r.cluster } })
                    })
                    .collect();

                let name = Self::route_config_name(identity);
                json!({
                    "name": name,
                    "virtual_hosts": [{
                        "name": name,
                        "domains": ["*"],
                        "routes": routes,
                    }],
                })
            })
            .collect()
    }

    fn endpoints(&self, config: &Config) -> Vec<Value> {
        config
            .endpoints
            .iter()
            .map(|(cluster, endpoints)| {
                let mut by_region: BTreeMap<&str, Vec<&Endpoint>> = BTreeMap::new();
                for e in endpoints {
                    by_region.entry(e.region.as_str()).or_default().push(e);
                }

                let localities: Vec<Value> = by_region
                    .into_iter()
                    .map(|(region, endpoints)| {
                        let lb_endpoints: Vec<Value> = endpoints
                            .iter()
                            .map(|e| {
                                json!({
                                    "endpoint": {
                                        "address": {
                                            "socket_address": { "address": e.address, "port_value": e.port }
                                        }
                                    },
                                    "load_balancing_weight": e.weight,
                                })
                            })
                            .collect();
                        json!({ "locality": { "region": region }, "lb_endpoints": lb_endpoints })
                    })
                    .collect();

                json!({ "cluster_name": cluster, "endpoints": localities })
            })
            .collect()
    }
}

impl ResourceTranslator for JsonTranslator {
    fn translate(&self, config: &Config) -> Result<Resources, TranslationError> {
        let mut resources = Resources::new();
        resources.insert(ResourceKind::Cluster, self.clusters(config)?);
        resources.insert(ResourceKind::Endpoint, self.endpoints(config));
        resources.insert(ResourceKind::Listener, self.listeners(config));
        resources.insert(ResourceKind::Route, self.routes(config));
        Ok(resources)
    }
}

fn lb_policy_name(policy: LbPolicy) -> &'static str {
    match policy {
        LbPolicy::RoundRobin => "ROUND_ROBIN",
        LbPolicy::WeightedRoundRobin => "WEIGHTED_ROUND_ROBIN",
        LbPolicy::LeastRequest => "LEAST_REQUEST",
        LbPolicy::Random => "RANDOM",
    }
}

fn health_protocol_name(protocol: HealthCheckProtocol) -> &'static str {
    match protocol {
        HealthCheckProtocol::Http => "HTTP",
        HealthCheckProtocol::Tcp => "TCP",
    }
}
