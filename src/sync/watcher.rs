//! Filesystem watcher feeding the synchronizer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::sync::event::SyncEvent;

/// Watches the fragment directories and emits [`SyncEvent`]s.
pub struct ConfigWatcher {
    paths: Vec<PathBuf>,
    poll_interval: Duration,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and the receiving end of its event stream.
    pub fn new(paths: Vec<PathBuf>, poll_interval: Duration) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        (
            Self {
                paths,
                poll_interval,
                event_tx,
            },
            event_rx,
        )
    }

    /// Start watching, then queue a create event per watched path so that
    /// documents already on disk are loaded.
    ///
    /// The event stream closes once the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.event_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for sync_event in map_event(&event) {
                        tracing::debug!(operation = %sync_event.operation, path = %sync_event.path.display(), "Change detected");
                        let _ = tx.send(sync_event);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        for path in &self.paths {
            watcher.watch(path, RecursiveMode::Recursive)?;
            tracing::info!(path = %path.display(), "Watching fragment directory");
        }

        for path in self.paths {
            let _ = self.event_tx.send(SyncEvent::create(path));
        }

        Ok(watcher)
    }
}

/// Translate a notify event into synchronizer events.
///
/// Renames reported without a direction are resolved by checking whether the
/// path still exists.
pub fn map_event(event: &Event) -> Vec<SyncEvent> {
    let paths = &event.paths;

    match &event.kind {
        EventKind::Create(_) => paths.iter().cloned().map(SyncEvent::create).collect(),
        EventKind::Remove(_) => paths.iter().cloned().map(SyncEvent::delete).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => paths.iter().cloned().map(SyncEvent::moved).collect(),
            RenameMode::To => paths.iter().cloned().map(SyncEvent::create).collect(),
            RenameMode::Both => match paths.as_slice() {
                [from, to] => vec![SyncEvent::moved(from.clone()), SyncEvent::create(to.clone())],
                _ => paths.iter().map(|p| by_existence(p, SyncEvent::create)).collect(),
            },
            _ => paths.iter().map(|p| by_existence(p, SyncEvent::create)).collect(),
        },
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => paths.iter().cloned().map(SyncEvent::modify).collect(),
        EventKind::Any => paths.iter().map(|p| by_existence(p, SyncEvent::modify)).collect(),
        EventKind::Access(_) | EventKind::Other => Vec::new(),
    }
}

fn by_existence(path: &Path, present: fn(PathBuf) -> SyncEvent) -> SyncEvent {
    if path.exists() {
        present(path.to_path_buf())
    } else {
        SyncEvent::moved(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::event::Operation;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    fn ops(events: Vec<SyncEvent>) -> Vec<(Operation, PathBuf)> {
        events.into_iter().map(|e| (e.operation, e.path)).collect()
    }

    #[test]
    fn test_create_modify_remove() {
        let created = map_event(&event(EventKind::Create(CreateKind::File), &["/c/a.toml"]));
        assert_eq!(ops(created), vec![(Operation::Create, PathBuf::from("/c/a.toml"))]);

        let modified = map_event(&event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), &["/c/a.toml"]));
        assert_eq!(ops(modified), vec![(Operation::Modify, PathBuf::from("/c/a.toml"))]);

        let removed = map_event(&event(EventKind::Remove(RemoveKind::Folder), &["/c"]));
        assert_eq!(ops(removed), vec![(Operation::Delete, PathBuf::from("/c"))]);
    }

    #[test]
    fn test_renames() {
        let both = map_event(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/c/old.toml", "/c/new.toml"],
        ));
        assert_eq!(
            ops(both),
            vec![
                (Operation::Move, PathBuf::from("/c/old.toml")),
                (Operation::Create, PathBuf::from("/c/new.toml")),
            ]
        );

        let from = map_event(&event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/c/old.toml"]));
        assert_eq!(ops(from), vec![(Operation::Move, PathBuf::from("/c/old.toml"))]);

        let to = map_event(&event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/c/new.toml"]));
        assert_eq!(ops(to), vec![(Operation::Create, PathBuf::from("/c/new.toml"))]);
    }

    #[test]
    fn test_undirected_rename_of_missing_path_is_move() {
        let any = map_event(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)),
            &["/definitely/not/here.toml"],
        ));
        assert_eq!(ops(any), vec![(Operation::Move, PathBuf::from("/definitely/not/here.toml"))]);
    }

    #[test]
    fn test_ignored_kinds() {
        assert!(map_event(&event(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)), &["/c/a.toml"])).is_empty());
        assert!(map_event(&event(EventKind::Access(AccessKind::Any), &["/c/a.toml"])).is_empty());
        assert!(map_event(&event(EventKind::Other, &["/c/a.toml"])).is_empty());
    }

    #[tokio::test]
    async fn test_initial_create_per_path() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, mut rx) = ConfigWatcher::new(vec![dir.path().to_path_buf()], Duration::from_millis(100));
        let _guard = watcher.run().unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first, SyncEvent::create(dir.path()));
    }
}
