//! Event-driven fragment synchronization.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::fragment::{FragmentParser, ParseError};
use crate::observability::metrics;
use crate::snapshot::{PublishError, Publisher, Snapshot};
use crate::store::FragmentStore;
use crate::sync::event::{Operation, SyncEvent};

/// A document that could not be installed.
#[derive(Debug, Error)]
#[error("{}: {error}", .path.display())]
pub struct ParseFailure {
    pub path: PathBuf,
    #[source]
    pub error: ParseError,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to inspect {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} document(s) rejected, publication skipped: {}", .0.len(), join(.0))]
    Parse(Vec<ParseFailure>),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

fn join(failures: &[ParseFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// What handling one event did.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub event_id: Uuid,
    pub event: SyncEvent,
    /// Paths whose fragment was (re)installed.
    pub installed: Vec<PathBuf>,
    /// Paths whose fragment was dropped.
    pub removed: Vec<PathBuf>,
    /// Snapshot published for this event, if any.
    pub published: Option<Arc<Snapshot>>,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Skip files whose name starts with a dot, such as editor swap files.
    pub ignore_hidden: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { ignore_hidden: true }
    }
}

/// Owns the fragment store and drives it from filesystem events.
pub struct Synchronizer {
    store: FragmentStore,
    parser: Box<dyn FragmentParser>,
    publisher: Publisher,
    options: SyncOptions,
}

impl Synchronizer {
    pub fn new(parser: Box<dyn FragmentParser>, publisher: Publisher, options: SyncOptions) -> Self {
        Self {
            store: FragmentStore::new(),
            parser,
            publisher,
            options,
        }
    }

    pub fn store(&self) -> &FragmentStore {
        &self.store
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Apply one event to the store and republish.
    ///
    /// Parse failures do not stop sibling documents from being installed, but
    /// they do skip publication so the last good snapshot keeps serving. An
    /// empty store is never published, and neither is an event that left the
    /// store unchanged: a delete that matched nothing, or a hidden or
    /// non-document file.
    pub fn handle(&mut self, event: SyncEvent) -> Result<SyncReport, SyncError> {
        let event_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "sync",
            %event_id,
            operation = %event.operation,
            path = %event.path.display()
        );
        let _enter = span.enter();

        metrics::record_sync_event(event.operation.as_str());

        let mut report = SyncReport {
            event_id,
            event: event.clone(),
            installed: Vec::new(),
            removed: Vec::new(),
            published: None,
        };

        match event.operation {
            Operation::Delete | Operation::Move => {
                report.removed = self.store.remove(&event.path);
            }
            Operation::Create | Operation::Modify => {
                // By name only; swap files are often gone before the stat.
                if self.is_hidden(&event.path) && !event.path.is_dir() {
                    tracing::debug!("Ignoring hidden file");
                    return Ok(report);
                }
                let failures = self.install(event.operation, &event.path, &mut report)?;
                if !failures.is_empty() {
                    metrics::record_fragment_count(self.store.len());
                    for failure in &failures {
                        metrics::record_parse_failure();
                        tracing::warn!(path = %failure.path.display(), error = %failure.error, "Document rejected");
                    }
                    return Err(SyncError::Parse(failures));
                }
            }
        }

        metrics::record_fragment_count(self.store.len());
        tracing::debug!(
            installed = report.installed.len(),
            removed = report.removed.len(),
            fragments = self.store.len(),
            "Store updated"
        );

        if report.installed.is_empty() && report.removed.is_empty() {
            tracing::debug!("Store unchanged, skipping publication");
            return Ok(report);
        }

        if self.store.is_empty() {
            tracing::info!("Fragment store is empty, skipping publication");
            return Ok(report);
        }

        report.published = Some(self.publisher.publish_store(&self.store)?);
        Ok(report)
    }

    /// Consume events until the channel closes, logging every failure.
    ///
    /// Blocks the calling thread; run it on a blocking task.
    pub fn run(mut self, mut events: mpsc::UnboundedReceiver<SyncEvent>) {
        tracing::info!("Synchronizer started");
        while let Some(event) = events.blocking_recv() {
            if let Err(e) = self.handle(event) {
                tracing::error!(error = %e, "Sync event failed");
            }
        }
        tracing::info!(fragments = self.store.len(), "Event stream closed, synchronizer stopped");
    }

    /// Expand `root` depth-first and install every document below it.
    ///
    /// Directories are tracked by canonical path so symlink cycles and the
    /// root itself are expanded at most once. Symlinked directories are
    /// expanded only after everything reachable through real directories, so
    /// a document inside the tree is stored under its real path rather than
    /// through an alias.
    fn install(
        &mut self,
        operation: Operation,
        root: &Path,
        report: &mut SyncReport,
    ) -> Result<Vec<ParseFailure>, SyncError> {
        let mut failures = Vec::new();
        let mut visited = HashSet::new();
        let mut pending = vec![root.to_path_buf()];
        let mut aliases = VecDeque::new();

        loop {
            let path = match pending.pop() {
                Some(path) => path,
                None => match aliases.pop_front() {
                    Some(alias) => alias,
                    None => break,
                },
            };

            let metadata = fs::metadata(&path).map_err(|source| io_error(&path, source))?;

            if !metadata.is_dir() {
                match self.skip_reason(&path) {
                    Some(reason) => tracing::debug!(path = %path.display(), reason, "Skipping file"),
                    None => self.install_file(operation, &path, report, &mut failures),
                }
                continue;
            }

            let canonical = fs::canonicalize(&path).map_err(|source| io_error(&path, source))?;
            if !visited.insert(canonical) {
                tracing::debug!(dir = %path.display(), "Directory already expanded");
                continue;
            }

            let mut children = Vec::new();
            for entry in WalkDir::new(&path).min_depth(1).max_depth(1).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    let at = e.path().unwrap_or(&path).to_path_buf();
                    io_error(&at, e.into())
                })?;
                if entry.path_is_symlink() && entry.path().is_dir() {
                    aliases.push_back(entry.into_path());
                } else {
                    children.push(entry.into_path());
                }
            }
            // Reversed so the stack pops siblings in name order.
            pending.extend(children.into_iter().rev());
        }

        Ok(failures)
    }

    fn install_file(
        &mut self,
        operation: Operation,
        path: &Path,
        report: &mut SyncReport,
        failures: &mut Vec<ParseFailure>,
    ) {
        if operation == Operation::Modify {
            report.removed.extend(self.store.remove(path));
        }

        match self.parser.parse(path) {
            Ok(fragment) => {
                tracing::debug!(path = %path.display(), "Fragment installed");
                self.store.put(path, fragment);
                report.installed.push(path.to_path_buf());
            }
            Err(error) => failures.push(ParseFailure {
                path: path.to_path_buf(),
                error,
            }),
        }
    }

    fn is_hidden(&self, path: &Path) -> bool {
        self.options.ignore_hidden
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with('.'))
    }

    /// Why a file is not treated as a fragment document, if it is not.
    fn skip_reason(&self, path: &Path) -> Option<&'static str> {
        if self.is_hidden(path) {
            Some("hidden")
        } else if !self.parser.accepts(path) {
            Some("not a fragment document")
        } else {
            None
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("fragments", &self.store.len())
            .field("publisher", &self.publisher)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
