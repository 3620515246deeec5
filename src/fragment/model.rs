//! Fragment and merged-configuration data model.
//!
//! All collections are ordered maps so that rendering a fragment or a merged
//! [`Config`] is deterministic.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fragment::availability::{Availability, AvailabilityError};

/// Which of the two proxy listeners a listener block describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerIdentity {
    Internal,
    External,
}

impl ListenerIdentity {
    pub const ALL: [ListenerIdentity; 2] = [ListenerIdentity::Internal, ListenerIdentity::External];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerIdentity::Internal => "internal",
            ListenerIdentity::External => "external",
        }
    }
}

impl fmt::Display for ListenerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load balancing policy of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LbPolicy {
    #[default]
    RoundRobin,
    WeightedRoundRobin,
    LeastRequest,
    Random,
}

/// How a route's path is compared against the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Exact path match.
    #[default]
    Path,
    Prefix,
}

/// Health check probe protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckProtocol {
    Http,
    #[default]
    Tcp,
}

/// A proxy listener.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Listener {
    pub identity: ListenerIdentity,
    pub address: String,
    pub port: u16,
    /// Fully qualified domain name served by the listener.
    pub common_name: String,
    /// Route keys, in serving order.
    pub routes: Vec<String>,
}

/// An upstream cluster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Cluster {
    pub name: String,
    /// Explicit scope. When `None` the scope is derived from the name suffix.
    pub availability: Option<Availability>,
    pub policy: LbPolicy,
    pub health_check: Option<HealthCheck>,
}

impl Cluster {
    /// Resolved availability scope of this cluster.
    pub fn scope(&self) -> Result<Availability, AvailabilityError> {
        match self.availability {
            Some(scope) => Ok(scope),
            None => Availability::from_name_suffix(&self.name),
        }
    }
}

/// A route from a request path to a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Route {
    pub availability: Option<Availability>,
    pub cluster: String,
    pub path: String,
    pub match_type: MatchType,
}

impl Route {
    /// Resolved availability scope, derived from the target cluster's name
    /// when not declared.
    pub fn scope(&self) -> Result<Availability, AvailabilityError> {
        match self.availability {
            Some(scope) => Ok(scope),
            None => Availability::from_name_suffix(&self.cluster),
        }
    }
}

/// One upstream host of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Endpoint {
    pub address: String,
    pub cluster: String,
    pub port: u16,
    pub region: String,
    /// Only meaningful under weighted round robin.
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HealthCheck {
    /// Consecutive successes before a host is marked healthy.
    pub healthy_threshold: u32,
    /// Consecutive failures before a host is marked unhealthy.
    pub unhealthy_threshold: u32,
    /// Host header sent with HTTP checks.
    pub host: Option<String>,
    pub interval_secs: u64,
    pub path: Option<String>,
    pub port: Option<u16>,
    pub protocol: HealthCheckProtocol,
}

/// Configuration contributed by a single source document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Fragment {
    pub listeners: BTreeMap<ListenerIdentity, Listener>,
    pub clusters: BTreeMap<String, Cluster>,
    pub routes: BTreeMap<String, Route>,
    pub endpoints: BTreeMap<String, Vec<Endpoint>>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill in the availability of every cluster and route, failing on the
    /// first name whose scope cannot be derived.
    pub fn resolve_availability(&mut self) -> Result<(), AvailabilityError> {
        for cluster in self.clusters.values_mut() {
            cluster.availability = Some(cluster.scope()?);
        }
        for route in self.routes.values_mut() {
            route.availability = Some(route.scope()?);
        }
        Ok(())
    }
}

/// The merged view over every live fragment.
///
/// Produced by [`crate::merge::merge`]; every cluster and route carries a
/// resolved availability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    pub listeners: BTreeMap<ListenerIdentity, Listener>,
    pub clusters: BTreeMap<String, Cluster>,
    pub routes: BTreeMap<String, Route>,
    pub endpoints: BTreeMap<String, Vec<Endpoint>>,
}

impl Config {
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
            && self.clusters.is_empty()
            && self.routes.is_empty()
            && self.endpoints.is_empty()
    }
}
