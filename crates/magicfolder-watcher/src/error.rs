//! Watcher error types

use thiserror::Error;

/// Result type alias for watcher operations
pub type WatcherResult<T> = Result<T, WatcherError>;

/// Errors from the filesystem watcher
#[derive(Debug, Error)]
pub enum WatcherError {
    /// The event backend failed to start or stop
    #[error("watch backend error: {0}")]
    Backend(#[from] notify::Error),

    /// The service threads could not be spawned
    #[error("failed to spawn watcher thread: {0}")]
    Spawn(std::io::Error),
}
