//! Watcher behavior knobs

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the file watcher
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// The root users manage; everything under it is observed
    pub drop_root: PathBuf,
    pub recursive: bool,

    /// New files must keep size+mtime stable for this long before enqueueing
    pub settle: Duration,

    /// Modified files are only reindexed after this much idle time
    pub modify_quiesce: Duration,

    /// Dirty sweeper wake period and per-sweep cap
    pub sweep_interval: Duration,
    pub reindex_batch_size: usize,

    /// Exact basenames to ignore
    pub ignore_patterns: Vec<String>,

    /// Suffix-based ignores for in-progress downloads and editor droppings
    pub ignore_suffixes: Vec<String>,
}

impl WatchConfig {
    /// Defaults for a given drop root
    pub fn new(drop_root: impl Into<PathBuf>) -> Self {
        Self {
            drop_root: drop_root.into(),
            recursive: true,
            settle: Duration::from_millis(1500),
            modify_quiesce: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
            reindex_batch_size: 50,
            ignore_patterns: [".DS_Store", "Thumbs.db", ".Spotlight-V100", ".fseventsd"]
                .map(String::from)
                .to_vec(),
            ignore_suffixes: [".tmp", ".part", ".download", ".crdownload"]
                .map(String::from)
                .to_vec(),
        }
    }
}
