//! Domain models for database entities

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use magicfolder_common::FileType;

use crate::error::{MetaDataError, MetaDataResult};

/// Task type tag for full processing of a newly observed file
pub const PROCESS_FILE_TASK: &str = "PROCESS_FILE";

/// Task type tag for reprocessing a modified file
pub const REINDEX_FILE_TASK: &str = "REINDEX_FILE";

/// Timestamp wire format used throughout the database (UTC)
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp for persistence
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a persisted timestamp
///
/// # Errors
///
/// Returns [`MetaDataError::Timestamp`] if the string does not match the
/// `YYYY-MM-DD HH:MM:SS` wire format.
pub fn parse_timestamp(value: &str) -> MetaDataResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| MetaDataError::Timestamp(format!("'{value}': {e}")))
}

/// Processing lifecycle of a file row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingStatus {
    Queued,
    Processing,
    Processed,
    Failed,
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Queued => "QUEUED",
            Self::Processing => "PROCESSING",
            Self::Processed => "PROCESSED",
            Self::Failed => "FAILED",
        };
        write!(f, "{status}")
    }
}

impl std::str::FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(Self::Queued),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Invalid processing status: {s}")),
        }
    }
}

/// Lifecycle of a queued task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        write!(f, "{status}")
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

/// Metadata known about a file before any processing has run
///
/// This is the input to `upsert_file_stub`; everything in it comes from a
/// single `stat` plus the path.
#[derive(Debug, Clone, Serialize)]
pub struct BasicFileMetadata {
    pub path: String,
    pub original_path: String,
    pub content_hash: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub processing_status: ProcessingStatus,
    pub tags: String,
}

impl BasicFileMetadata {
    /// Build a stub from a single `stat` of the path
    ///
    /// The content hash starts empty; the pipeline fills it in after
    /// extraction. Status starts at QUEUED.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the path cannot be stat'ed.
    pub fn from_fs(path: &std::path::Path) -> std::io::Result<Self> {
        let stat = std::fs::metadata(path)?;
        let modified: DateTime<Utc> = stat.modified().map_or_else(|_| Utc::now(), DateTime::from);
        let path_str = path.display().to_string();
        Ok(Self {
            path: path_str.clone(),
            original_path: path_str,
            content_hash: String::new(),
            file_type: FileType::from_path(path),
            file_size: i64::try_from(stat.len()).unwrap_or(i64::MAX),
            created_at: modified,
            last_modified: modified,
            processing_status: ProcessingStatus::Queued,
            tags: String::new(),
        })
    }
}

/// A full file row, including AI-derived fields
#[derive(Debug, Clone, Serialize)]
pub struct FileMetadata {
    pub id: i64,
    pub path: String,
    pub original_path: String,
    pub content_hash: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub processing_status: ProcessingStatus,
    pub tags: String,
    pub summary_vector: Option<Vec<f32>>,
    pub suggested_category: String,
    pub suggested_filename: String,
}

/// A row in the durable task queue
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub task_type: String,
    pub file_path: String,
    pub status: TaskStatus,
    pub priority: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A chunk ready for persistence: compressed payload plus its embedding
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    pub chunk_index: i64,
    pub compressed_content: Vec<u8>,
    pub vector: Vec<f32>,
}

/// A file-level search hit
#[derive(Debug, Clone, Serialize)]
pub struct FileSearchResult {
    pub id: i64,
    pub distance: f32,
    pub file: FileMetadata,
}

/// A chunk-level search hit
///
/// `file_id`, `chunk_index`, and `compressed_content` are hydrated by
/// `fill_chunk_metadata` after the ANN search produced `(id, distance)`.
#[derive(Debug, Clone)]
pub struct ChunkSearchResult {
    pub id: i64,
    pub distance: f32,
    pub file_id: i64,
    pub chunk_index: i64,
    pub compressed_content: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_round_trip_at_second_precision() {
        let formatted = "2026-08-01 12:34:56";
        let parsed = parse_timestamp(formatted).expect("parse");
        assert_eq!(format_timestamp(parsed), formatted);
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2026-08-01T12:34:56Z").is_err());
    }

    #[test]
    fn status_round_trips() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            let parsed: TaskStatus = status.to_string().parse().expect("parse");
            assert_eq!(parsed, status);
        }
        for status in [
            ProcessingStatus::Queued,
            ProcessingStatus::Processing,
            ProcessingStatus::Processed,
            ProcessingStatus::Failed,
        ] {
            let parsed: ProcessingStatus = status.to_string().parse().expect("parse");
            assert_eq!(parsed, status);
        }
    }
}
