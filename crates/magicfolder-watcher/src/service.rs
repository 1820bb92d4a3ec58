//! The watcher service: settle map, dirty sweeper, initial scan
//!
//! The on-event path is O(1) work plus a map insertion; everything slow
//! (stat loops, enqueueing, store updates) happens on the two background
//! threads. Each map has its own mutex so the backend thread never waits on
//! a sweep in progress.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use magicfolder_meta_data::{
    BasicFileMetadata, MetadataStore, PROCESS_FILE_TASK, REINDEX_FILE_TASK, TaskEnqueue, TaskQueue,
};

use crate::config::WatchConfig;
use crate::error::{WatcherError, WatcherResult};
use crate::events::{EventHandler, NotifyBackend, WatchBackend, WatchEvent, WatchEventKind};

/// Settle loop wake period
const SETTLE_TICK: Duration = Duration::from_millis(300);

/// Background sleeps happen in slices so stop requests are honored promptly
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Priority for PROCESS_FILE tasks from the settle loop
const PROCESS_PRIORITY: i64 = 10;

/// Priority for REINDEX_FILE tasks from the dirty sweeper (sooner than fresh
/// files: the user is actively editing these)
const REINDEX_PRIORITY: i64 = 8;

/// Read-only statistics snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct WatcherStats {
    pub events_seen: u64,
    pub files_enqueued: u64,
    pub files_marked_dirty: u64,
    pub overflows: u64,
    pub scans_performed: u64,
}

/// Last observed snapshot of a file waiting to settle
struct SeenEntry {
    size: u64,
    mtime: Option<SystemTime>,
    last_seen: Instant,
}

struct WatcherInner {
    cfg: WatchConfig,
    queue: Arc<TaskQueue>,
    store: Arc<MetadataStore>,
    running: AtomicBool,
    /// Settle map: path -> last stat snapshot
    seen: Mutex<HashMap<PathBuf, SeenEntry>>,
    /// Dirty map: path -> last modification instant
    dirty: Mutex<HashMap<PathBuf, Instant>>,
    stats: Mutex<WatcherStats>,
}

/// Producer that turns filesystem events into queue work
pub struct FileWatcherService {
    inner: Arc<WatcherInner>,
    backend: Option<Box<dyn WatchBackend>>,
    settle_thread: Option<std::thread::JoinHandle<()>>,
    sweeper_thread: Option<std::thread::JoinHandle<()>>,
}

impl FileWatcherService {
    pub fn new(cfg: WatchConfig, queue: Arc<TaskQueue>, store: Arc<MetadataStore>) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                cfg,
                queue,
                store,
                running: AtomicBool::new(false),
                seen: Mutex::new(HashMap::new()),
                dirty: Mutex::new(HashMap::new()),
                stats: Mutex::new(WatcherStats::default()),
            }),
            backend: None,
            settle_thread: None,
            sweeper_thread: None,
        }
    }

    /// Start the backend stream, settle loop, and dirty sweeper
    ///
    /// # Errors
    ///
    /// Returns backend errors if the filesystem watch cannot be established
    /// and spawn errors for the loop threads.
    pub fn start(&mut self) -> WatcherResult<()> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let handler: EventHandler = {
            let inner = Arc::clone(&self.inner);
            Arc::new(move |event: WatchEvent| inner.handle_event(&event))
        };
        let mut backend = Box::new(NotifyBackend::new(
            self.inner.cfg.drop_root.clone(),
            self.inner.cfg.recursive,
            handler,
        ));
        backend.start()?;
        self.backend = Some(backend);

        let settle_inner = Arc::clone(&self.inner);
        self.settle_thread = Some(
            std::thread::Builder::new()
                .name("magicfolder-settle".to_string())
                .spawn(move || settle_inner.settle_loop())
                .map_err(WatcherError::Spawn)?,
        );

        let sweeper_inner = Arc::clone(&self.inner);
        self.sweeper_thread = Some(
            std::thread::Builder::new()
                .name("magicfolder-sweeper".to_string())
                .spawn(move || sweeper_inner.dirty_sweeper_loop())
                .map_err(WatcherError::Spawn)?,
        );

        info!(root = %self.inner.cfg.drop_root.display(), "file watcher started");
        Ok(())
    }

    /// Stop the backend and join both loops; safe to call more than once
    pub fn stop(&mut self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(mut backend) = self.backend.take() {
            backend.stop();
        }
        if let Some(handle) = self.settle_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.sweeper_thread.take() {
            let _ = handle.join();
        }
        info!("file watcher stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Reconcile by enumerating the drop root as Created events
    pub fn initial_scan(&self) {
        self.inner.initial_scan();
    }

    /// Feed one event through the same path the backend uses
    ///
    /// Public so tests and fake backends can drive the service directly.
    pub fn handle_event(&self, event: &WatchEvent) {
        self.inner.handle_event(event);
    }

    /// Run one settle-map pass (the loop does this every ~300 ms)
    pub fn run_settle_pass(&self) {
        self.inner.settle_pass();
    }

    /// Run one dirty-sweep pass (the loop does this every `sweep_interval`)
    pub fn run_sweep_pass(&self) {
        self.inner.sweep_pass();
    }

    /// Lightweight stats snapshot
    pub fn stats(&self) -> WatcherStats {
        *self
            .inner
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FileWatcherService {
    fn drop(&mut self) {
        self.stop();
    }
}

impl WatcherInner {
    fn handle_event(&self, event: &WatchEvent) {
        self.bump_stats(|stats| stats.events_seen += 1);

        if event.kind == WatchEventKind::Overflow {
            self.handle_overflow();
            return;
        }
        if event.is_dir {
            return;
        }
        if self.ignore_path(&event.path) {
            debug!(path = %event.path.display(), "ignored by filter");
            return;
        }

        match event.kind {
            WatchEventKind::Created => self.coalesce_created(&event.path),
            WatchEventKind::Modified => self.handle_modified(&event.path),
            WatchEventKind::Renamed => match &event.old_path {
                Some(old_path) => self.handle_renamed(old_path, &event.path),
                // Backends that cannot pair rename ends report the new path
                // alone; treat it as a fresh arrival.
                None => self.coalesce_created(&event.path),
            },
            WatchEventKind::Deleted => self.handle_deleted(&event.path),
            WatchEventKind::Overflow => {}
        }
    }

    /// Put a path into the settle map with a fresh stat snapshot
    fn coalesce_created(&self, path: &Path) {
        let Ok(metadata) = std::fs::metadata(path) else {
            debug!(path = %path.display(), "created path vanished before stat");
            return;
        };
        if !metadata.is_file() {
            return;
        }

        let entry = SeenEntry {
            size: metadata.len(),
            mtime: metadata.modified().ok(),
            last_seen: Instant::now(),
        };
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), entry);
    }

    fn handle_modified(&self, path: &Path) {
        self.dirty
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), Instant::now());
        self.bump_stats(|stats| stats.files_marked_dirty += 1);
    }

    fn handle_renamed(&self, from: &Path, to: &Path) {
        let from_str = from.display().to_string();
        let to_str = to.display().to_string();
        match self.store.update_path_if_exists(&from_str, &to_str) {
            Ok(true) => debug!(from = %from_str, to = %to_str, "file path updated"),
            Ok(false) => {}
            Err(e) => warn!(from = %from_str, error = %e, "rename update failed"),
        }
        // The new path may also carry new content.
        self.coalesce_created(to);
    }

    fn handle_deleted(&self, path: &Path) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
        self.dirty
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
        let path_str = path.display().to_string();
        match self.store.delete_file_metadata_if_exists(&path_str) {
            Ok(true) => debug!(path = %path_str, "file metadata removed"),
            Ok(false) => {}
            Err(e) => warn!(path = %path_str, error = %e, "delete update failed"),
        }
    }

    fn handle_overflow(&self) {
        self.bump_stats(|stats| stats.overflows += 1);
        warn!("event overflow reported, reconciling with a scan");
        self.initial_scan();
    }

    fn initial_scan(&self) {
        self.bump_stats(|stats| stats.scans_performed += 1);

        if !self.cfg.drop_root.exists() {
            warn!(root = %self.cfg.drop_root.display(), "drop root does not exist");
            return;
        }

        let max_depth = if self.cfg.recursive { usize::MAX } else { 1 };
        for entry in WalkDir::new(&self.cfg.drop_root)
            .max_depth(max_depth)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if self.ignore_path(path) {
                continue;
            }
            self.bump_stats(|stats| stats.events_seen += 1);
            self.coalesce_created(path);
        }
    }

    /// One pass over the settle map: enqueue entries that are stable and aged
    fn settle_pass(&self) {
        let now = Instant::now();
        let mut ready = Vec::new();
        {
            let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
            seen.retain(|path, entry| {
                let Ok(metadata) = std::fs::metadata(path) else {
                    // Vanished between events; the Deleted handler usually
                    // beats us here.
                    return false;
                };
                let unchanged =
                    metadata.len() == entry.size && metadata.modified().ok() == entry.mtime;
                let aged = now.duration_since(entry.last_seen) >= self.cfg.settle;

                if unchanged && aged {
                    ready.push(path.clone());
                    return false;
                }
                if !unchanged {
                    // Still being written: take a new snapshot and restart
                    // the settle clock.
                    entry.size = metadata.len();
                    entry.mtime = metadata.modified().ok();
                    entry.last_seen = now;
                }
                true
            });
        }

        for path in ready {
            self.enqueue_task(&path, PROCESS_FILE_TASK, PROCESS_PRIORITY);
        }
    }

    /// One pass over the dirty map: enqueue entries that have quiesced
    fn sweep_pass(&self) {
        let quiesce = self.cfg.modify_quiesce;
        let mut to_reindex = Vec::new();
        {
            let mut dirty = self.dirty.lock().unwrap_or_else(PoisonError::into_inner);
            for (path, last_modified) in dirty.iter() {
                if to_reindex.len() >= self.cfg.reindex_batch_size {
                    // Leave the rest dirty; the next sweep picks them up.
                    break;
                }
                if last_modified.elapsed() >= quiesce {
                    to_reindex.push(path.clone());
                }
            }
            for path in &to_reindex {
                dirty.remove(path);
            }
        }

        for path in to_reindex {
            self.enqueue_task(&path, REINDEX_FILE_TASK, REINDEX_PRIORITY);
        }
    }

    fn settle_loop(&self) {
        while self.running.load(Ordering::SeqCst) {
            self.settle_pass();
            self.sleep_while_running(SETTLE_TICK);
        }
    }

    fn dirty_sweeper_loop(&self) {
        while self.running.load(Ordering::SeqCst) {
            self.sleep_while_running(self.cfg.sweep_interval);
            if self.running.load(Ordering::SeqCst) {
                self.sweep_pass();
            }
        }
    }

    /// Upsert the file stub, then enqueue; both are idempotent
    fn enqueue_task(&self, path: &Path, task_type: &str, priority: i64) {
        let path_str = path.display().to_string();
        match BasicFileMetadata::from_fs(path) {
            Ok(stub) => {
                if let Err(e) = self.store.upsert_file_stub(&stub) {
                    warn!(path = %path_str, error = %e, "file stub upsert failed");
                    return;
                }
            }
            Err(_) => {
                debug!(path = %path_str, "file vanished before enqueue");
                return;
            }
        }

        match self.queue.create_task(task_type, &path_str, priority) {
            Ok(TaskEnqueue::Created(task_id)) => {
                debug!(path = %path_str, task_type, task_id, "task enqueued");
                self.bump_stats(|stats| stats.files_enqueued += 1);
            }
            Ok(TaskEnqueue::AlreadyQueued) => {
                debug!(path = %path_str, task_type, "task already outstanding");
            }
            Err(e) => warn!(path = %path_str, error = %e, "task enqueue failed"),
        }
    }

    fn ignore_path(&self, path: &Path) -> bool {
        // Only files inside the drop root matter.
        if !path.starts_with(&self.cfg.drop_root) {
            return true;
        }
        if std::fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
        {
            return true;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return true;
        };
        if self
            .cfg
            .ignore_patterns
            .iter()
            .any(|pattern| name == pattern.as_str())
        {
            return true;
        }
        self.cfg
            .ignore_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
    }

    fn bump_stats(&self, update: impl FnOnce(&mut WatcherStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut stats);
    }

    fn sleep_while_running(&self, total: Duration) {
        let mut remaining = total;
        while !remaining.is_zero() && self.running.load(Ordering::SeqCst) {
            let slice = remaining.min(SLEEP_SLICE);
            std::thread::sleep(slice);
            remaining -= slice;
        }
    }
}
