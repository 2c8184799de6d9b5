//! Archive directory watcher
//!
//! `notify` delivers events on its own thread. The callback only classifies
//! them and hands them to a bounded channel with `try_send`; a tokio task on
//! the other end applies them to the [`PackageIndex`]. The observer thread
//! never waits on the index.

use std::path::{Path, PathBuf};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::JoinHandle as ThreadHandle;

use anyhow::Context;
use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cargo::is_crate_archive;
use crate::index::PackageIndex;

/// Default capacity of the observer-to-index queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// A change to the archive directory that the index should follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(path) | WatchEvent::Removed(path) => path,
        }
    }
}

/// Translate a raw `notify` event into index changes.
///
/// Only files with the archive extension count. Folder events, including the
/// watched directory itself disappearing, are ignored. A rename into the
/// directory is a creation and a rename out of it is a removal. A file closed
/// after writing is loaded again, so an archive copied in place is re-read
/// once complete.
pub fn classify(event: &Event) -> Vec<WatchEvent> {
    let created = |path: &PathBuf| WatchEvent::Created(path.clone());
    let removed = |path: &PathBuf| WatchEvent::Removed(path.clone());

    let events: Vec<WatchEvent> = match &event.kind {
        EventKind::Create(kind) if *kind != CreateKind::Folder => {
            event.paths.iter().map(created).collect()
        }
        EventKind::Remove(kind) if *kind != RemoveKind::Folder => {
            event.paths.iter().map(removed).collect()
        }
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
            event.paths.iter().map(created).collect()
        }
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::To => event.paths.iter().map(created).collect(),
            RenameMode::From => event.paths.iter().map(removed).collect(),
            RenameMode::Both => match event.paths.as_slice() {
                [from, to] => vec![removed(from), created(to)],
                _ => Vec::new(),
            },
            // Backends that cannot tell the two sides apart
            _ => event
                .paths
                .iter()
                .map(|path| if path.exists() { created(path) } else { removed(path) })
                .collect(),
        },
        _ => Vec::new(),
    };

    events
        .into_iter()
        .filter(|event| is_crate_archive(event.path()))
        .collect()
}

/// Keeps a [`PackageIndex`] in step with one archive directory.
#[derive(Debug)]
pub struct DirectoryWatcher {
    dir: PathBuf,
    stop_observer: std_mpsc::Sender<()>,
    observer: ThreadHandle<()>,
    stop_pump: oneshot::Sender<()>,
    pump: JoinHandle<()>,
}

impl DirectoryWatcher {
    /// Start watching `dir` (non-recursively).
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(dir: &Path, index: Arc<PackageIndex>, queue_capacity: usize) -> anyhow::Result<Self> {
        let (events_tx, events_rx) = mpsc::channel(queue_capacity.max(1));

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Archive directory watch error");
                    return;
                }
            };

            for change in classify(&event) {
                match events_tx.try_send(change) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(change)) => {
                        warn!(path = %change.path().display(), "Watch queue full, dropping event");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => return,
                }
            }
        })
        .context("Failed to create archive directory watcher")?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;

        let (stop_observer, stop_rx) = std_mpsc::channel::<()>();
        let observer = std::thread::Builder::new()
            .name("archive-watcher".to_string())
            .spawn(move || {
                let _watcher = watcher;
                // Returns on an explicit stop or when the sender is dropped
                let _ = stop_rx.recv();
            })
            .context("Failed to spawn archive watcher thread")?;

        let (stop_pump, stop_pump_rx) = oneshot::channel();
        let pump = tokio::spawn(pump_events(events_rx, stop_pump_rx, index));

        info!(dir = %dir.display(), "Watching archive directory");
        Ok(Self {
            dir: dir.to_path_buf(),
            stop_observer,
            observer,
            stop_pump,
            pump,
        })
    }

    /// Stop observing, apply whatever events are still queued and wait for
    /// both the observer thread and the index task to finish.
    pub async fn shutdown(self) {
        let _ = self.stop_observer.send(());
        let observer = self.observer;
        match tokio::task::spawn_blocking(move || observer.join()).await {
            Ok(Ok(())) => {}
            _ => warn!(dir = %self.dir.display(), "Archive watcher thread did not exit cleanly"),
        }

        let _ = self.stop_pump.send(());
        if let Err(e) = self.pump.await {
            warn!(error = %e, "Watch event task failed");
        }

        info!(dir = %self.dir.display(), "Stopped watching archive directory");
    }
}

async fn pump_events(
    mut events: mpsc::Receiver<WatchEvent>,
    mut stop: oneshot::Receiver<()>,
    index: Arc<PackageIndex>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            next = events.recv() => match next {
                Some(event) => apply(&index, event).await,
                None => return,
            },
        }
    }

    while let Ok(event) = events.try_recv() {
        apply(&index, event).await;
    }
}

async fn apply(index: &PackageIndex, event: WatchEvent) {
    debug!(event = ?event, "Archive directory changed");
    let result = match &event {
        WatchEvent::Created(path) => index.load(path).await,
        WatchEvent::Removed(path) => index.unlist(path).await,
    };
    if let Err(e) = result {
        warn!(path = %event.path().display(), error = %e, "Ignoring archive directory event");
    }
}
