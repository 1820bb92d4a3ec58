//! Centralized configuration management for Magic Folder
//!
//! Configuration is loaded from a JSON file at startup. Every key is optional
//! and falls back to a safe default; validation runs once after
//! deserialization and any violation is fatal.

pub mod error;

pub use error::{ConfigError, ConfigResult};

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// SAFE DEFAULTS
// =============================================================================

const DEFAULT_API_BASE_URL: &str = "127.0.0.1:3030";
const DEFAULT_METADATA_DB_PATH: &str = "./data/metadata.db";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "mxbai-embed-large";
const DEFAULT_NUM_WORKERS: usize = 1;
const DEFAULT_WATCH_DIRECTORY: &str = "./data/watch";
const DEFAULT_FILE_WATCHER_ENABLED: bool = true;
const DEFAULT_SETTLE_MS: u64 = 1500;
const DEFAULT_MODIFY_QUIESCE_MINUTES: u64 = 5;

/// Lower bound on the settle window; anything shorter degenerates into
/// enqueueing files that are still being written.
const MIN_SETTLE_MS: u64 = 100;

/// Core configuration for the whole application
///
/// Deserialized from a flat JSON object; missing keys take the defaults above.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Address the HTTP API binds to (`host:port`)
    pub api_base_url: String,

    /// Path of the encrypted SQLite metadata database
    pub metadata_db_path: String,

    /// Base URL of the Ollama embedding server
    pub ollama_url: String,

    /// Embedding model name passed to the embedding server
    pub embedding_model: String,

    /// Number of background worker threads (must be > 0)
    pub num_workers: usize,

    /// Drop directory observed by the file watcher
    pub watch_directory: String,

    /// Whether the file watcher runs at all
    pub file_watcher_enabled: bool,

    /// How long a new file's size+mtime must stay stable before it is enqueued
    pub file_watcher_settle_ms: u64,

    /// How long a modified file must stay untouched before a reindex is enqueued
    pub file_watcher_modify_quiesce_minutes: u64,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            metadata_db_path: DEFAULT_METADATA_DB_PATH.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            num_workers: DEFAULT_NUM_WORKERS,
            watch_directory: DEFAULT_WATCH_DIRECTORY.to_string(),
            file_watcher_enabled: DEFAULT_FILE_WATCHER_ENABLED,
            file_watcher_settle_ms: DEFAULT_SETTLE_MS,
            file_watcher_modify_quiesce_minutes: DEFAULT_MODIFY_QUIESCE_MINUTES,
        }
    }
}

impl ApplicationConfig {
    /// Load and validate configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON, and
    /// [`ConfigError::Validation`] if any setting is out of range.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string (useful for tests)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Validation`] like
    /// [`Self::from_file`].
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all settings
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending setting.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.api_base_url.is_empty() {
            return Err(ConfigError::Validation(
                "api_base_url cannot be empty".to_string(),
            ));
        }
        if self.metadata_db_path.is_empty() {
            return Err(ConfigError::Validation(
                "metadata_db_path cannot be empty".to_string(),
            ));
        }
        if self.ollama_url.is_empty() {
            return Err(ConfigError::Validation(
                "ollama_url cannot be empty".to_string(),
            ));
        }
        if self.embedding_model.is_empty() {
            return Err(ConfigError::Validation(
                "embedding_model cannot be empty".to_string(),
            ));
        }
        if self.num_workers == 0 {
            return Err(ConfigError::Validation(
                "num_workers must be greater than 0".to_string(),
            ));
        }
        if self.file_watcher_enabled && self.watch_directory.is_empty() {
            return Err(ConfigError::Validation(
                "watch_directory cannot be empty when file_watcher_enabled is true".to_string(),
            ));
        }
        if self.file_watcher_settle_ms < MIN_SETTLE_MS {
            return Err(ConfigError::Validation(format!(
                "file_watcher_settle_ms must be at least {MIN_SETTLE_MS}ms"
            )));
        }
        if self.file_watcher_modify_quiesce_minutes < 1 {
            return Err(ConfigError::Validation(
                "file_watcher_modify_quiesce_minutes must be at least 1 minute".to_string(),
            ));
        }
        Ok(())
    }

    /// Settle window as a [`Duration`]
    pub const fn settle_window(&self) -> Duration {
        Duration::from_millis(self.file_watcher_settle_ms)
    }

    /// Modify-quiesce window as a [`Duration`]
    pub const fn modify_quiesce_window(&self) -> Duration {
        Duration::from_secs(self.file_watcher_modify_quiesce_minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_yields_defaults() {
        let config = ApplicationConfig::from_json("{}").expect("defaults should validate");
        assert_eq!(config.api_base_url, "127.0.0.1:3030");
        assert_eq!(config.metadata_db_path, "./data/metadata.db");
        assert_eq!(config.ollama_url, "http://localhost:11434");
        assert_eq!(config.embedding_model, "mxbai-embed-large");
        assert_eq!(config.num_workers, 1);
        assert_eq!(config.watch_directory, "./data/watch");
        assert!(config.file_watcher_enabled);
        assert_eq!(config.file_watcher_settle_ms, 1500);
        assert_eq!(config.file_watcher_modify_quiesce_minutes, 5);
    }

    #[test]
    fn overrides_are_applied() {
        let config = ApplicationConfig::from_json(
            r#"{"num_workers": 4, "file_watcher_settle_ms": 250, "embedding_model": "nomic-embed-text"}"#,
        )
        .expect("valid config");
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.file_watcher_settle_ms, 250);
        assert_eq!(config.embedding_model, "nomic-embed-text");
        // Untouched keys keep their defaults.
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = ApplicationConfig::from_json(r#"{"num_workers": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn short_settle_window_is_rejected() {
        let err = ApplicationConfig::from_json(r#"{"file_watcher_settle_ms": 50}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn empty_watch_directory_only_matters_when_watcher_enabled() {
        let err = ApplicationConfig::from_json(r#"{"watch_directory": ""}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let config = ApplicationConfig::from_json(
            r#"{"watch_directory": "", "file_watcher_enabled": false}"#,
        )
        .expect("watcher disabled, empty directory allowed");
        assert!(!config.file_watcher_enabled);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = ApplicationConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn from_file_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"num_workers": 2}}"#).expect("write");
        let config = ApplicationConfig::from_file(file.path()).expect("load");
        assert_eq!(config.num_workers, 2);

        let err = ApplicationConfig::from_file("/nonexistent/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn duration_accessors_convert_units() {
        let config = ApplicationConfig::default();
        assert_eq!(config.settle_window(), Duration::from_millis(1500));
        assert_eq!(config.modify_quiesce_window(), Duration::from_secs(300));
    }
}
