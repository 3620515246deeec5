//! Reconciliation core of the reverse-proxy control plane.
//!
//! Fragment documents on disk are parsed into a keyed store, merged into one
//! configuration and published as versioned snapshots for the proxy fleet.

pub mod admin;
pub mod config;
pub mod fragment;
pub mod lifecycle;
pub mod merge;
pub mod observability;
pub mod snapshot;
pub mod store;
pub mod sync;

pub use config::schema::ControlPlaneConfig;
pub use fragment::{Availability, Config, Fragment};
pub use lifecycle::Shutdown;
pub use snapshot::{Publisher, Snapshot, SnapshotHandle};
pub use store::FragmentStore;
pub use sync::{SyncEvent, Synchronizer};
