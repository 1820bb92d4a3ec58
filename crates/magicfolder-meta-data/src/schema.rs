//! Schema creation and migrations
//!
//! The schema is created idempotently on first open. Vectors are stored as
//! raw little-endian float32 blobs; chunk rows are replaced wholesale on
//! reprocessing through the `(file_id, chunk_index)` unique index.

use rusqlite::Connection;

use crate::error::{DatabaseErrorExt, MetaDataResult};

/// Create all tables and indexes if they do not exist yet
///
/// # Errors
///
/// Returns a classified database error if any DDL statement fails.
pub fn initialize_schema(conn: &Connection) -> MetaDataResult<()> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT UNIQUE NOT NULL,
            original_path TEXT,
            file_hash TEXT NOT NULL,
            processing_status TEXT NOT NULL,
            summary_vector_blob BLOB,
            suggested_category TEXT,
            suggested_filename TEXT,
            tags TEXT,
            last_modified TEXT NOT NULL,
            created_at TEXT NOT NULL,
            file_type TEXT NOT NULL,
            file_size INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL,
            chunk_index INTEGER NOT NULL,
            content BLOB NOT NULL,
            vector_blob BLOB,
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_chunks_file_chunk
            ON chunks(file_id, chunk_index);

        CREATE TABLE IF NOT EXISTS task_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_type TEXT NOT NULL,
            file_path TEXT NOT NULL,
            status TEXT DEFAULT 'PENDING',
            priority INTEGER DEFAULT 10,
            error_message TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Makes the claim query index-only.
        CREATE INDEX IF NOT EXISTS idx_task_queue_status_priority
            ON task_queue(status, priority, created_at);

        -- One outstanding task per (type, path); enqueue while a matching task
        -- is PENDING or PROCESSING is an idempotent no-op.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_task_queue_active
            ON task_queue(task_type, file_path)
            WHERE status IN ('PENDING', 'PROCESSING');
        ",
    )
    .map_db_err("initialize_schema")
}
