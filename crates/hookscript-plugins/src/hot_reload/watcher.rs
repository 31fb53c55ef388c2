//! File system watcher
//!
//! Monitors one directory for file changes and dispatches them to a
//! [`FilesystemCallback`] on a background task. Events are debounced per
//! path: a burst of events for one file (truncate, write, close) is
//! delivered once, as its last event, after the file has been quiet for the
//! debounce duration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    event::{AccessKind, AccessMode, ModifyKind, RenameMode},
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Watcher error types
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WatchError {
    #[error("Watch path does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

/// Watch configuration
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Quiet period after the last event for a path before it is delivered
    pub debounce_duration: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

impl WatchConfig {
    /// Create a new watch config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set debounce duration
    pub fn with_debounce(mut self, duration: Duration) -> Self {
        self.debounce_duration = duration;
        self
    }
}

/// Receives file change notifications for a watched directory.
#[async_trait::async_trait]
pub trait FilesystemCallback: Send + 'static {
    async fn created(&mut self, path: &Path);

    async fn modified(&mut self, path: &Path);

    async fn deleted(&mut self, path: &Path);
}

/// Watch event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// File created, or renamed into place
    Created,
    /// File contents modified
    Modified,
    /// File removed, or renamed away
    Removed,
}

/// Watch event
#[derive(Debug, Clone)]
pub struct WatchEvent {
    /// Event kind
    pub kind: WatchEventKind,
    /// Affected path
    pub path: PathBuf,
}

impl WatchEvent {
    /// Create a new watch event
    pub fn new(kind: WatchEventKind, path: PathBuf) -> Self {
        Self { kind, path }
    }

    /// Translate a raw notify event into zero or more watch events.
    pub fn from_notify(event: &Event) -> Vec<WatchEvent> {
        let kind = match event.kind {
            EventKind::Create(_) => WatchEventKind::Created,
            EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Other)
            | EventKind::Access(AccessKind::Close(AccessMode::Write))
            | EventKind::Any => WatchEventKind::Modified,
            EventKind::Remove(_) => WatchEventKind::Removed,
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => WatchEventKind::Removed,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => WatchEventKind::Created,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                // paths = [from, to]
                let mut events = Vec::new();
                if let Some(from) = event.paths.first() {
                    events.push(WatchEvent::new(WatchEventKind::Removed, from.clone()));
                }
                if let Some(to) = event.paths.get(1) {
                    events.push(WatchEvent::new(WatchEventKind::Created, to.clone()));
                }
                return events;
            }
            EventKind::Modify(ModifyKind::Name(_)) => {
                // Platforms that cannot tell the two ends of a rename apart.
                return event
                    .paths
                    .iter()
                    .map(|path| {
                        let kind = if path.exists() {
                            WatchEventKind::Created
                        } else {
                            WatchEventKind::Removed
                        };
                        WatchEvent::new(kind, path.clone())
                    })
                    .collect();
            }
            _ => return Vec::new(),
        };

        event
            .paths
            .iter()
            .map(|path| WatchEvent::new(kind, path.clone()))
            .collect()
    }
}

/// Watches a single directory, non-recursively.
pub struct FilesystemWatcher {
    /// Watched directory
    directory: PathBuf,
    /// Internal watcher handle
    watcher: Option<RecommendedWatcher>,
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Event dispatch task
    task: Option<JoinHandle<()>>,
}

impl FilesystemWatcher {
    /// Start watching `directory`, dispatching debounced events to
    /// `callback`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<C: FilesystemCallback>(
        directory: impl AsRef<Path>,
        config: WatchConfig,
        mut callback: C,
    ) -> Result<Self, WatchError> {
        let directory = directory.as_ref().to_path_buf();
        if !directory.is_dir() {
            return Err(WatchError::MissingDirectory(directory));
        }

        info!("Starting filesystem watcher on {:?}", directory);

        let (tx, mut rx) = mpsc::channel::<Event>(1024);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let watcher_config = Config::default().with_poll_interval(Duration::from_millis(100));
        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(e) => warn!("Filesystem watch error: {}", e),
            },
            watcher_config,
        )?;
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        let debounce = config.debounce_duration;
        let task = tokio::spawn(async move {
            // path -> (latest kind, delivery deadline)
            let mut pending: HashMap<PathBuf, (WatchEventKind, Instant)> = HashMap::new();

            loop {
                let next_due = pending.values().map(|(_, due)| *due).min();

                tokio::select! {
                    received = rx.recv() => {
                        let Some(event) = received else { return };
                        let due = Instant::now() + debounce;
                        for evt in WatchEvent::from_notify(&event) {
                            if pending.insert(evt.path.clone(), (evt.kind, due)).is_some() {
                                debug!("Debounced event for {:?}", evt.path);
                            }
                        }
                    }
                    _ = tokio::time::sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                        let now = Instant::now();
                        let ready: Vec<WatchEvent> = pending
                            .iter()
                            .filter(|(_, (_, due))| *due <= now)
                            .map(|(path, (kind, _))| WatchEvent::new(*kind, path.clone()))
                            .collect();
                        for evt in ready {
                            pending.remove(&evt.path);
                            debug!("Watch event: {:?}", evt);
                            match evt.kind {
                                WatchEventKind::Created => callback.created(&evt.path).await,
                                WatchEventKind::Modified => callback.modified(&evt.path).await,
                                WatchEventKind::Removed => callback.deleted(&evt.path).await,
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Filesystem watcher shutting down");
                        return;
                    }
                }
            }
        });

        Ok(Self {
            directory,
            watcher: Some(watcher),
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Get watched directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Whether the watcher has not been stopped
    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// Stop watching. Idempotent.
    pub async fn stop(&mut self) {
        // Dropping the OS watcher first closes the event channel.
        if self.watcher.take().is_some() {
            info!("Stopping filesystem watcher on {:?}", self.directory);
        }

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}
