//! Configuration fragments.
//!
//! # Data Flow
//! ```text
//! source document (.toml / .json)
//!     → parser.rs (deserialize, apply listener defaults)
//!     → availability.rs (resolve scope of every cluster and route)
//!     → Fragment (one per source path, stored by the synchronizer)
//! ```
//!
//! # Design Decisions
//! - A fragment is immutable once parsed; a changed document is re-parsed
//!   into a new fragment that replaces the old one wholesale
//! - Availability is resolved at parse time so a document with an
//!   underivable scope is never installed

pub mod availability;
pub mod model;
pub mod parser;

pub use availability::{Availability, AvailabilityError};
pub use model::{
    Cluster, Config, Endpoint, Fragment, HealthCheck, HealthCheckProtocol, LbPolicy, Listener,
    ListenerIdentity, MatchType, Route,
};
pub use parser::{DocumentFormat, FileFragmentParser, FragmentParser, ParseError};
