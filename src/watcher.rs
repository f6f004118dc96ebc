//! File-system watcher driving incremental index updates.
//!
//! notify delivers events into an mpsc channel; one background thread
//! drains it, filters to relevant source files, and invokes the callback.
//! Events are dispatched in delivery order with no debouncing or
//! coalescing.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::errors::{IndexError, Result};

/// Extensions considered source files by the watcher and the indexer walk.
pub const WATCHED_EXTENSIONS: [&str; 5] = ["java", "ts", "tsx", "js", "jsx"];

/// Git-style patterns excluded from watching.
pub const IGNORE_PATTERNS: [&str; 7] = [
    "node_modules/",
    "target/",
    "build/",
    "dist/",
    ".git/",
    ".vscode/",
    ".idea/",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    Created,
    Modified,
    Deleted,
}

pub type EventCallback = Arc<dyn Fn(&Path, FileEvent) + Send + Sync>;

/// Watches a project tree and dispatches filtered events to a callback.
///
/// State machine: Stopped -> Watching -> Stopped. `start` is a no-op while
/// watching; `stop` joins the dispatch thread, so no callback fires after
/// it returns.
pub struct FileWatcher {
    root: PathBuf,
    callback: EventCallback,
    filter: Arc<EventFilter>,
    handle: Option<WatchHandle>,
}

struct WatchHandle {
    watcher: RecommendedWatcher,
    thread: thread::JoinHandle<()>,
}

impl FileWatcher {
    pub fn new(root: PathBuf, callback: EventCallback) -> Result<Self> {
        let filter = Arc::new(EventFilter::new(&root)?);
        Ok(Self {
            root,
            callback,
            filter,
            handle: None,
        })
    }

    pub fn is_watching(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel::<Event>();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            Config::default(),
        )
        .map_err(|e| IndexError::Watch(e.to_string()))?;
        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| IndexError::Watch(e.to_string()))?;

        let callback = Arc::clone(&self.callback);
        let filter = Arc::clone(&self.filter);
        let thread = thread::spawn(move || {
            // Runs until the watcher is dropped and the channel disconnects.
            while let Ok(event) = rx.recv() {
                let Some(kind) = classify(&event.kind) else {
                    continue;
                };
                for path in &event.paths {
                    if filter.accepts(path) {
                        (callback)(path, kind);
                    }
                }
            }
        });

        debug!(root = %self.root.display(), "file watcher started");
        self.handle = Some(WatchHandle { watcher, thread });
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(WatchHandle { watcher, thread }) = self.handle.take() {
            drop(watcher); // closes the event channel
            if thread.join().is_err() {
                warn!("watcher dispatch thread panicked");
            }
            debug!(root = %self.root.display(), "file watcher stopped");
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn classify(kind: &EventKind) -> Option<FileEvent> {
    match kind {
        EventKind::Create(_) => Some(FileEvent::Created),
        EventKind::Modify(_) => Some(FileEvent::Modified),
        EventKind::Remove(_) => Some(FileEvent::Deleted),
        _ => None,
    }
}

/// Accepts paths with a watched extension that no ignore pattern matches.
pub(crate) struct EventFilter {
    ignore: Gitignore,
}

impl EventFilter {
    pub(crate) fn new(root: &Path) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in IGNORE_PATTERNS {
            builder
                .add_line(None, pattern)
                .map_err(|e| IndexError::Watch(e.to_string()))?;
        }
        let ignore = builder.build().map_err(|e| IndexError::Watch(e.to_string()))?;
        Ok(Self { ignore })
    }

    pub(crate) fn accepts(&self, path: &Path) -> bool {
        let watched = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| WATCHED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        watched && !self.ignore.matched_path_or_any_parents(path, false).is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn filter_accepts_watched_extensions_only() {
        let dir = tempfile::tempdir().unwrap();
        let filter = EventFilter::new(dir.path()).unwrap();

        assert!(filter.accepts(&dir.path().join("src/Main.java")));
        assert!(filter.accepts(&dir.path().join("app.tsx")));
        assert!(!filter.accepts(&dir.path().join("notes.md")));
        assert!(!filter.accepts(&dir.path().join("Makefile")));
    }

    #[test]
    fn filter_rejects_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        let filter = EventFilter::new(dir.path()).unwrap();

        assert!(!filter.accepts(&dir.path().join("node_modules/lib/index.js")));
        assert!(!filter.accepts(&dir.path().join("sub/target/Gen.java")));
        assert!(!filter.accepts(&dir.path().join(".idea/workspace.ts")));
        assert!(filter.accepts(&dir.path().join("src/targeted.java")));
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher =
            FileWatcher::new(dir.path().to_path_buf(), Arc::new(|_path: &Path, _event| {})).unwrap();

        assert!(!watcher.is_watching());
        watcher.start().unwrap();
        watcher.start().unwrap();
        assert!(watcher.is_watching());
        watcher.stop();
        watcher.stop();
        assert!(!watcher.is_watching());
    }

    #[test]
    fn dispatches_events_for_created_files() {
        let dir = tempfile::tempdir().unwrap();
        let seen: Arc<Mutex<Vec<(PathBuf, FileEvent)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut watcher = FileWatcher::new(
            dir.path().to_path_buf(),
            Arc::new(move |path: &Path, event| sink.lock().push((path.to_path_buf(), event))),
        )
        .unwrap();
        watcher.start().unwrap();

        fs::write(dir.path().join("New.java"), "class New {}").unwrap();
        fs::write(dir.path().join("ignored.txt"), "not source").unwrap();
        thread::sleep(Duration::from_secs(2));
        watcher.stop();

        let events = seen.lock();
        assert!(events.iter().any(|(path, _)| path.ends_with("New.java")));
        assert!(events.iter().all(|(path, _)| !path.ends_with("ignored.txt")));
    }
}
