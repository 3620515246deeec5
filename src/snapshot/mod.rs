//! Snapshot publication subsystem.
//!
//! # Data Flow
//! ```text
//! FragmentStore
//!     → merge (full recompute)
//!     → translator.rs (Config → resources by kind)
//!     → publisher.rs (assign next version)
//!     → consistency.rs (every reference resolves)
//!     → handle.rs (atomic swap, notify subscribers)
//!     → readers: admin API, snapshot server
//! ```
//!
//! # Design Decisions
//! - Single writer (the publisher), many lock-free readers via `arc-swap`
//! - A failed publication never touches the served snapshot
//! - Version numbers are never reused, even for rejected attempts

pub mod consistency;
pub mod handle;
pub mod publisher;
pub mod translator;

pub use consistency::{ConsistencyError, Violation};
pub use handle::{Snapshot, SnapshotHandle};
pub use publisher::{PublishError, Publisher};
pub use translator::{JsonTranslator, ResourceKind, ResourceTranslator, Resources, TranslationError};
