//! Synchronization subsystem.
//!
//! # Data Flow
//! ```text
//! notify watcher (watcher.rs)
//!     → SyncEvent { create | modify | delete | move, path } (event.rs)
//!     → unbounded channel
//!     → synchronizer.rs, one event at a time:
//!         delete / move   → store.remove(path)   (file or whole directory)
//!         create / modify → stat path
//!             directory   → depth-first worklist, documents parsed and stored,
//!                           symlinked directories last
//!             file        → (modify: drop old) parse, store
//!     → publisher (only when the store changed, is non-empty and nothing
//!       was rejected)
//! ```
//!
//! # Design Decisions
//! - The synchronizer is the only writer of the fragment store
//! - Directory expansion is an explicit worklist with a visited set, never
//!   recursion, so cycles through symlinks terminate
//! - A rejected document never halts its siblings, but skips publication so
//!   the last good snapshot stays authoritative
//! - Files the parser does not accept are not fragments and are skipped
//! - No retries; the next event for a path is the retry

pub mod event;
pub mod synchronizer;
pub mod watcher;

pub use event::{Operation, SyncEvent};
pub use synchronizer::{ParseFailure, SyncError, SyncOptions, SyncReport, Synchronizer};
pub use watcher::ConfigWatcher;
