//! Merge engine.
//!
//! # Data Flow
//! ```text
//! FragmentStore (path-ordered fragments)
//!     → engine.rs (union listeners, key clusters/routes, concat endpoints)
//!     → Config (recomputed from scratch on every change)
//! ```
//!
//! # Design Decisions
//! - Pure function of its input; no state survives between merges
//! - Merge order is the store's path order, so last-writer-wins is
//!   reproducible
//! - Identical redeclarations of a cluster or route are not conflicts

pub mod engine;

pub use engine::{merge, DuplicatePolicy, MergeError};
