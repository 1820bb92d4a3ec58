//! Backend-neutral watch events and the notify-based backend
//!
//! The service consumes the event shape below regardless of platform; the
//! notify backend translates raw filesystem notifications into it. Tests
//! construct events directly and skip the backend entirely.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::warn;

use crate::error::WatcherResult;

/// High-level event kind the service cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// File created or moved into the drop root
    Created,
    /// Content write/save
    Modified,
    /// Path changed within the drop root
    Renamed,
    /// Removed or moved out of the drop root
    Deleted,
    /// The backend dropped events; a rescan is needed
    Overflow,
}

/// One observed filesystem event
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub path: PathBuf,
    /// Previous path, for renames where the backend reports both ends
    pub old_path: Option<PathBuf>,
    pub is_dir: bool,
    pub kind: WatchEventKind,
    pub timestamp: SystemTime,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: WatchEventKind) -> Self {
        let path = path.into();
        Self {
            is_dir: path.is_dir(),
            path,
            old_path: None,
            kind,
            timestamp: SystemTime::now(),
        }
    }
}

/// Callback invoked for every translated event
pub type EventHandler = Arc<dyn Fn(WatchEvent) + Send + Sync>;

/// Minimal backend interface: start delivering events, stop delivering events
pub trait WatchBackend: Send {
    /// Begin watching; events flow to the handler from a backend thread
    ///
    /// # Errors
    ///
    /// Returns a backend error if the watch cannot be established.
    fn start(&mut self) -> WatcherResult<()>;

    /// Stop the stream; no events are delivered afterwards
    fn stop(&mut self);
}

/// Backend built on the `notify` crate's recommended platform watcher
pub struct NotifyBackend {
    root: PathBuf,
    recursive: bool,
    handler: EventHandler,
    watcher: Option<RecommendedWatcher>,
}

impl NotifyBackend {
    pub fn new(root: impl Into<PathBuf>, recursive: bool, handler: EventHandler) -> Self {
        Self {
            root: root.into(),
            recursive,
            handler,
            watcher: None,
        }
    }
}

impl WatchBackend for NotifyBackend {
    fn start(&mut self) -> WatcherResult<()> {
        let handler = Arc::clone(&self.handler);
        let mut watcher =
            notify::recommended_watcher(move |result: Result<notify::Event, notify::Error>| {
                match result {
                    Ok(event) => {
                        for translated in translate(&event) {
                            handler(translated);
                        }
                    }
                    Err(e) => warn!(error = %e, "watch backend error"),
                }
            })?;
        let mode = if self.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&self.root, mode)?;
        self.watcher = Some(watcher);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            let _ = watcher.unwatch(&self.root);
        }
    }
}

/// Translate one raw notify event into zero or more watch events
fn translate(event: &notify::Event) -> Vec<WatchEvent> {
    if event.need_rescan() {
        return vec![WatchEvent::new(PathBuf::new(), WatchEventKind::Overflow)];
    }

    match &event.kind {
        EventKind::Create(_) => per_path(event, WatchEventKind::Created),
        EventKind::Remove(_) => per_path(event, WatchEventKind::Deleted),
        EventKind::Modify(ModifyKind::Name(mode)) => translate_rename(event, *mode),
        EventKind::Modify(_) => per_path(event, WatchEventKind::Modified),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

fn translate_rename(event: &notify::Event, mode: RenameMode) -> Vec<WatchEvent> {
    match mode {
        RenameMode::Both if event.paths.len() == 2 => {
            let mut translated = WatchEvent::new(event.paths[1].clone(), WatchEventKind::Renamed);
            translated.old_path = Some(event.paths[0].clone());
            vec![translated]
        }
        RenameMode::From => per_path(event, WatchEventKind::Deleted),
        RenameMode::To => per_path(event, WatchEventKind::Created),
        // Ambiguous rename halves: a path that still exists came in, one that
        // does not went away.
        _ => event
            .paths
            .iter()
            .map(|path| {
                let kind = if path.exists() {
                    WatchEventKind::Created
                } else {
                    WatchEventKind::Deleted
                };
                WatchEvent::new(path.clone(), kind)
            })
            .collect(),
    }
}

fn per_path(event: &notify::Event, kind: WatchEventKind) -> Vec<WatchEvent> {
    event
        .paths
        .iter()
        .map(|path: &PathBuf| WatchEvent::new(path.clone(), kind))
        .collect()
}
