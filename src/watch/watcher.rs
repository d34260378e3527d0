// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::errors::Result;
use crate::types::{ChangeType, FileChangeEvent};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::ExclusionSet;

/// Message forwarded from the watcher backend into the async world.
#[derive(Debug, Clone)]
pub enum WatcherMessage {
    Change(FileChangeEvent),
    /// The backend reported an error; the watcher may have stopped.
    Error(String),
}

/// Anything that can feed normalised change messages into the watch loop.
///
/// `start` may be called again after an error; the previous guard is dropped
/// first.
pub trait ChangeSource: Send {
    /// Keeps the source alive. Dropping it stops delivery.
    type Guard: Send;

    fn start(&mut self, tx: mpsc::UnboundedSender<WatcherMessage>) -> Result<Self::Guard>;
}

/// Keeps the underlying `RecommendedWatcher` alive.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Recursive filesystem watcher rooted at one directory.
#[derive(Debug, Clone)]
pub struct FileWatcher {
    root: PathBuf,
    exclusions: Arc<ExclusionSet>,
}

impl FileWatcher {
    pub fn new(root: impl Into<PathBuf>, exclusions: ExclusionSet) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self {
            root,
            exclusions: Arc::new(exclusions),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Turn a raw backend path into a change event, or `None` when it lies
    /// outside the root or matches an exclusion.
    pub fn normalize(&self, path: &Path, change_type: ChangeType) -> Option<FileChangeEvent> {
        normalize_path(&self.root, &self.exclusions, path, change_type)
    }
}

impl ChangeSource for FileWatcher {
    type Guard = WatcherHandle;

    fn start(&mut self, tx: mpsc::UnboundedSender<WatcherMessage>) -> Result<WatcherHandle> {
        let root = self.root.clone();
        let exclusions = Arc::clone(&self.exclusions);

        // Runs on the notify thread: normalise and forward, never block.
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let Some(change_type) = change_type_of(&event.kind) else {
                        return;
                    };
                    for path in &event.paths {
                        if let Some(change) =
                            normalize_path(&root, &exclusions, path, change_type)
                        {
                            let _ = tx.send(WatcherMessage::Change(change));
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(WatcherMessage::Error(err.to_string()));
                }
            },
            Config::default(),
        )?;

        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        info!(root = %self.root.display(), "file watcher started");

        Ok(WatcherHandle { _inner: watcher })
    }
}

/// Map a notify event kind onto our change types. Access and metadata-only
/// noise is dropped.
pub fn change_type_of(kind: &EventKind) -> Option<ChangeType> {
    match kind {
        EventKind::Create(_) => Some(ChangeType::Created),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeType::Renamed),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeType::Modified),
        EventKind::Remove(_) => Some(ChangeType::Deleted),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

fn normalize_path(
    root: &Path,
    exclusions: &ExclusionSet,
    path: &Path,
    change_type: ChangeType,
) -> Option<FileChangeEvent> {
    let Some(rel) = relative_str(root, path) else {
        trace!(path = %path.display(), "ignoring path outside watch root");
        return None;
    };

    if exclusions.is_excluded(&rel) {
        trace!(%rel, "ignoring excluded path");
        return None;
    }

    debug!(%rel, %change_type, "file change");
    Some(FileChangeEvent::new(path, rel, change_type))
}
