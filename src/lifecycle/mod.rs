//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Logging/metrics → Synchronizer → Watcher → Admin API
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → Stop admin API → Drop watcher → Synchronizer drains and exits
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The watcher is dropped last so queued events are still applied

pub mod shutdown;

pub use shutdown::Shutdown;
