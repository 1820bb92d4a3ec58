//! Filesystem watcher: turns drop-directory events into queue work
//!
//! New files are debounced until their size and mtime settle; modified files
//! are marked dirty and swept into reindex tasks once they quiesce. The
//! backend is abstracted so tests can inject events directly.

pub mod config;
pub mod error;
pub mod events;
pub mod service;

pub use config::WatchConfig;
pub use error::{WatcherError, WatcherResult};
pub use events::{NotifyBackend, WatchBackend, WatchEvent, WatchEventKind};
pub use service::{FileWatcherService, WatcherStats};
