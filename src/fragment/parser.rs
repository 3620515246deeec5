//! Fragment document parsing.
//!
//! # Document layout
//! ```toml
//! [[clusters]]
//! name = "checkout-in"
//! policy = "round-robin"          # optional
//!
//! [[routes]]
//! name = "checkout"               # optional, defaults to the cluster name
//! cluster = "checkout-in"
//! path = "/checkout"
//! match = "prefix"                # "path" (exact, default) or "prefix"
//!
//! [[endpoints]]
//! cluster = "checkout-in"
//! address = "10.0.0.12"
//! port = 8443                     # optional, default 443
//!
//! [[listeners]]                   # optional
//! name = "internal"
//! routes = ["checkout"]
//! ```
//!
//! The same layout is accepted as JSON. Documents without a `listeners`
//! section get every route attached to each listener its scope allows.

use std::collections::btree_map::Entry;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::config::ListenersConfig;
use crate::fragment::availability::{Availability, AvailabilityError};
use crate::fragment::model::{
    Cluster, Endpoint, Fragment, HealthCheck, HealthCheckProtocol, LbPolicy, Listener,
    ListenerIdentity, MatchType, Route,
};

/// Error returned when a document cannot become a fragment.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read document: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid TOML document: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported document format {0:?}")]
    UnsupportedFormat(String),

    #[error("duplicate {kind} {name:?} in document")]
    Duplicate { kind: &'static str, name: String },

    #[error(transparent)]
    Availability(#[from] AvailabilityError),
}

/// Turns one source document into a [`Fragment`].
///
/// Implementations must not touch the fragment store.
pub trait FragmentParser: Send {
    fn parse(&self, path: &Path) -> Result<Fragment, ParseError>;

    /// Whether `path` names a document this parser reads. Other files found
    /// while expanding a directory are skipped instead of rejected.
    fn accepts(&self, _path: &Path) -> bool {
        true
    }
}

impl<F> FragmentParser for F
where
    F: Fn(&Path) -> Result<Fragment, ParseError> + Send,
{
    fn parse(&self, path: &Path) -> Result<Fragment, ParseError> {
        self(path)
    }
}

/// On-disk document encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_ascii_lowercase().as_str() {
            "toml" => Ok(DocumentFormat::Toml),
            "json" => Ok(DocumentFormat::Json),
            _ => Err(ParseError::UnsupportedFormat(ext.to_string())),
        }
    }
}

/// Default parser reading TOML and JSON documents from disk.
#[derive(Debug, Clone, Default)]
pub struct FileFragmentParser {
    listeners: ListenersConfig,
}

impl FileFragmentParser {
    /// Listener address, port and common name fall back to `listeners`.
    pub fn new(listeners: ListenersConfig) -> Self {
        Self { listeners }
    }

    /// Parse a document held in memory.
    pub fn parse_str(&self, content: &str, format: DocumentFormat) -> Result<Fragment, ParseError> {
        let document: Document = match format {
            DocumentFormat::Toml => toml::from_str(content)?,
            DocumentFormat::Json => serde_json::from_str(content)?,
        };
        self.build(document)
    }

    fn build(&self, document: Document) -> Result<Fragment, ParseError> {
        let mut fragment = Fragment::new();

        for doc in document.clusters {
            let cluster = Cluster {
                availability: doc.availability,
                policy: doc.policy,
                health_check: doc.health_check.map(HealthCheck::from),
                name: doc.name,
            };
            match fragment.clusters.entry(cluster.name.clone()) {
                Entry::Occupied(e) => {
                    return Err(ParseError::Duplicate { kind: "cluster", name: e.key().clone() })
                }
                Entry::Vacant(e) => {
                    e.insert(cluster);
                }
            }
        }

        let mut route_order = Vec::with_capacity(document.routes.len());
        for doc in document.routes {
            let key = doc.name.unwrap_or_else(|| doc.cluster.clone());
            let route = Route {
                availability: doc.availability,
                cluster: doc.cluster,
                path: doc.path,
                match_type: doc.match_type,
            };
            match fragment.routes.entry(key.clone()) {
                Entry::Occupied(_) => return Err(ParseError::Duplicate { kind: "route", name: key }),
                Entry::Vacant(e) => {
                    e.insert(route);
                }
            }
            route_order.push(key);
        }

        for doc in document.endpoints {
            fragment
                .endpoints
                .entry(doc.cluster.clone())
                .or_default()
                .push(Endpoint {
                    address: doc.address,
                    cluster: doc.cluster,
                    port: doc.port,
                    region: doc.region,
                    weight: doc.weight,
                });
        }

        // Resolve scopes before attaching routes so bad names reject the
        // whole document.
        fragment.resolve_availability()?;

        if document.listeners.is_empty() {
            for key in route_order {
                let scope = fragment.routes[&key].scope()?;
                for identity in scope.listeners() {
                    fragment
                        .listeners
                        .entry(identity)
                        .or_insert_with(|| self.default_listener(identity))
                        .routes
                        .push(key.clone());
                }
            }
        } else {
            for doc in document.listeners {
                let defaults = self.listeners.get(doc.name);
                let listener = Listener {
                    identity: doc.name,
                    address: doc.address.unwrap_or_else(|| defaults.address.clone()),
                    port: doc.port.unwrap_or(defaults.port),
                    common_name: doc.common_name.unwrap_or_else(|| defaults.common_name.clone()),
                    routes: doc.routes,
                };
                if fragment.listeners.insert(doc.name, listener).is_some() {
                    return Err(ParseError::Duplicate {
                        kind: "listener",
                        name: doc.name.to_string(),
                    });
                }
            }
        }

        Ok(fragment)
    }

    fn default_listener(&self, identity: ListenerIdentity) -> Listener {
        let defaults = self.listeners.get(identity);
        Listener {
            identity,
            address: defaults.address.clone(),
            port: defaults.port,
            common_name: defaults.common_name.clone(),
            routes: Vec::new(),
        }
    }
}

impl FragmentParser for FileFragmentParser {
    fn parse(&self, path: &Path) -> Result<Fragment, ParseError> {
        let format = DocumentFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        self.parse_str(&content, format)
    }

    fn accepts(&self, path: &Path) -> bool {
        DocumentFormat::from_path(path).is_ok()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Document {
    listeners: Vec<ListenerDoc>,
    clusters: Vec<ClusterDoc>,
    routes: Vec<RouteDoc>,
    endpoints: Vec<EndpointDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListenerDoc {
    name: ListenerIdentity,
    address: Option<String>,
    port: Option<u16>,
    common_name: Option<String>,
    #[serde(default)]
    routes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClusterDoc {
    name: String,
    availability: Option<Availability>,
    #[serde(default)]
    policy: LbPolicy,
    health_check: Option<HealthCheckDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HealthCheckDoc {
    #[serde(default = "default_healthy_threshold")]
    healthy_threshold: u32,
    #[serde(default = "default_unhealthy_threshold")]
    unhealthy_threshold: u32,
    host: Option<String>,
    #[serde(default = "default_interval_secs")]
    interval_secs: u64,
    path: Option<String>,
    port: Option<u16>,
    #[serde(default)]
    protocol: HealthCheckProtocol,
}

impl From<HealthCheckDoc> for HealthCheck {
    fn from(doc: HealthCheckDoc) -> Self {
        HealthCheck {
            healthy_threshold: doc.healthy_threshold,
            unhealthy_threshold: doc.unhealthy_threshold,
            host: doc.host,
            interval_secs: doc.interval_secs,
            path: doc.path,
            port: doc.port,
            protocol: doc.protocol,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteDoc {
    name: Option<String>,
    cluster: String,
    path: String,
    #[serde(default, rename = "match")]
    match_type: MatchType,
    availability: Option<Availability>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EndpointDoc {
    cluster: String,
    address: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_region")]
    region: String,
    #[serde(default)]
    weight: u32,
}

fn default_healthy_threshold() -> u32 {
    2
}

fn default_unhealthy_threshold() -> u32 {
    3
}

fn default_interval_secs() -> u64 {
    10
}

fn default_port() -> u16 {
    443
}

fn default_region() -> String {
    "global".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKOUT: &str = r#"
        [[clusters]]
        name = "checkout-in"

        [[routes]]
        cluster = "checkout-in"
        path = "/checkout"
        match = "prefix"

        [[endpoints]]
        cluster = "checkout-in"
        address = "10.0.0.12"
    "#;

    #[test]
    fn test_parse_toml_with_defaults() {
        let parser = FileFragmentParser::default();
        let fragment = parser.parse_str(CHECKOUT, DocumentFormat::Toml).unwrap();

        let cluster = &fragment.clusters["checkout-in"];
        assert_eq!(cluster.availability, Some(Availability::Internal));
        assert_eq!(cluster.policy, LbPolicy::RoundRobin);

        // Route key falls back to the cluster name.
        let route = &fragment.routes["checkout-in"];
        assert_eq!(route.match_type, MatchType::Prefix);

        let endpoint = &fragment.endpoints["checkout-in"][0];
        assert_eq!(endpoint.port, 443);
        assert_eq!(endpoint.region, "global");
        assert_eq!(endpoint.weight, 0);
    }

    #[test]
    fn test_routes_attach_to_compatible_listeners() {
        let parser = FileFragmentParser::default();
        let fragment = parser.parse_str(CHECKOUT, DocumentFormat::Toml).unwrap();

        let internal = &fragment.listeners[&ListenerIdentity::Internal];
        assert_eq!(internal.routes, vec!["checkout-in".to_string()]);
        assert_eq!(internal.port, 443);
        assert!(!fragment.listeners.contains_key(&ListenerIdentity::External));
    }

    #[test]
    fn test_explicit_listeners_take_defaults_from_config() {
        let mut listeners = ListenersConfig::default();
        listeners.external.common_name = "www.example.com".into();
        let parser = FileFragmentParser::new(listeners);

        let json = r#"{
            "clusters": [{ "name": "shop-ie", "policy": "least-request" }],
            "routes": [{ "name": "shop", "cluster": "shop-ie", "path": "/shop" }],
            "endpoints": [{ "cluster": "shop-ie", "address": "10.1.0.1", "region": "region-a", "weight": 5 }],
            "listeners": [{ "name": "external", "port": 8443, "routes": ["shop"] }]
        }"#;
        let fragment = parser.parse_str(json, DocumentFormat::Json).unwrap();

        let external = &fragment.listeners[&ListenerIdentity::External];
        assert_eq!(external.port, 8443);
        assert_eq!(external.common_name, "www.example.com");
        assert_eq!(external.routes, vec!["shop".to_string()]);
        assert!(!fragment.listeners.contains_key(&ListenerIdentity::Internal));
        assert_eq!(fragment.clusters["shop-ie"].policy, LbPolicy::LeastRequest);
    }

    #[test]
    fn test_health_check_defaults() {
        let doc = r#"
            [[clusters]]
            name = "api-ex"
            [clusters.health_check]
            path = "/healthz"
            protocol = "http"
        "#;
        let fragment = FileFragmentParser::default().parse_str(doc, DocumentFormat::Toml).unwrap();
        let check = fragment.clusters["api-ex"].health_check.as_ref().unwrap();
        assert_eq!(check.healthy_threshold, 2);
        assert_eq!(check.unhealthy_threshold, 3);
        assert_eq!(check.interval_secs, 10);
        assert_eq!(check.protocol, HealthCheckProtocol::Http);
    }

    #[test]
    fn test_bad_suffix_rejects_document() {
        let doc = r#"
            [[clusters]]
            name = "checkout-xx"
        "#;
        let err = FileFragmentParser::default().parse_str(doc, DocumentFormat::Toml).unwrap_err();
        assert!(matches!(err, ParseError::Availability(_)));
    }

    #[test]
    fn test_duplicate_route_key_in_document() {
        let doc = r#"
            [[routes]]
            cluster = "a-in"
            path = "/one"

            [[routes]]
            cluster = "a-in"
            path = "/two"
        "#;
        let err = FileFragmentParser::default().parse_str(doc, DocumentFormat::Toml).unwrap_err();
        assert!(matches!(err, ParseError::Duplicate { kind: "route", .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("/a/b.toml")).unwrap(), DocumentFormat::Toml);
        assert_eq!(DocumentFormat::from_path(Path::new("/a/b.JSON")).unwrap(), DocumentFormat::Json);
        assert!(matches!(
            DocumentFormat::from_path(Path::new("/a/b.cfg")),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_accepts_only_documents() {
        let parser = FileFragmentParser::default();
        assert!(parser.accepts(Path::new("/conf.d/svc.toml")));
        assert!(parser.accepts(Path::new("/conf.d/svc.json")));
        assert!(!parser.accepts(Path::new("/conf.d/README.md")));
        assert!(!parser.accepts(Path::new("/conf.d/svc.toml~")));
        assert!(!parser.accepts(Path::new("/conf.d/Makefile")));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let doc = r#"
            [[clusters]]
            name = "a-in"
            balance = "fast"
        "#;
        assert!(FileFragmentParser::default().parse_str(doc, DocumentFormat::Toml).is_err());
    }
}
