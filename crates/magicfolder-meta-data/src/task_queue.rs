//! Durable FIFO-with-priority task queue
//!
//! Tasks persist in the `task_queue` table. Claiming runs inside a single
//! `BEGIN IMMEDIATE` transaction so concurrent workers see each task move
//! from PENDING to PROCESSING at most once.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{DatabaseErrorExt, MetaDataResult, text_conversion_error};
use crate::models::{Task, TaskStatus, format_timestamp, parse_timestamp};
use crate::pool::ConnectionPool;

const BUSY_RETRY_ATTEMPTS: u32 = 3;
const BUSY_RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Outcome of an enqueue attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEnqueue {
    /// A new task row was created
    Created(i64),
    /// An identical task is already PENDING or PROCESSING; nothing was added
    AlreadyQueued,
}

/// Repository over the durable task queue
pub struct TaskQueue {
    pool: Arc<ConnectionPool>,
}

impl TaskQueue {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Insert a PENDING task
    ///
    /// Enqueueing the same `(task_type, file_path)` while an earlier task is
    /// still outstanding returns [`TaskEnqueue::AlreadyQueued`] instead of a
    /// second row.
    ///
    /// # Errors
    ///
    /// Returns classified database errors; constraint violations on the
    /// active-task index are mapped to the `AlreadyQueued` outcome.
    pub fn create_task(
        &self,
        task_type: &str,
        file_path: &str,
        priority: i64,
    ) -> MetaDataResult<TaskEnqueue> {
        let conn = self.pool.acquire()?;
        let now = format_timestamp(Utc::now());
        let result = conn
            .execute(
                "INSERT INTO task_queue (task_type, file_path, status, priority, created_at, updated_at)
                 VALUES (?1, ?2, 'PENDING', ?3, ?4, ?4)",
                rusqlite::params![task_type, file_path, priority, now],
            )
            .map_db_err("create_task");
        match result {
            Ok(_) => Ok(TaskEnqueue::Created(conn.last_insert_rowid())),
            Err(e) if e.is_constraint() => {
                debug!(task_type, file_path, "task already queued, skipping");
                Ok(TaskEnqueue::AlreadyQueued)
            }
            Err(e) => Err(e),
        }
    }

    /// Atomically claim the next PENDING task, if any
    ///
    /// Selects the minimum `(priority, created_at)` row and flips it to
    /// PROCESSING inside one immediate transaction. Busy/locked conflicts are
    /// retried a bounded number of times before surfacing.
    ///
    /// # Errors
    ///
    /// Returns classified database errors once retries are exhausted.
    pub fn fetch_and_claim_next_task(&self) -> MetaDataResult<Option<Task>> {
        with_busy_retry(|| self.claim_once())
    }

    fn claim_once(&self) -> MetaDataResult<Option<Task>> {
        let mut conn = self.pool.acquire()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_db_err("claim_next_task")?;

        let task = tx
            .query_row(
                "SELECT id, task_type, file_path, status, priority, error_message,
                        created_at, updated_at
                 FROM task_queue
                 WHERE status = 'PENDING'
                 ORDER BY priority ASC, created_at ASC
                 LIMIT 1",
                [],
                task_from_row,
            )
            .optional()
            .map_db_err("claim_next_task")?;

        let Some(mut task) = task else {
            // Nothing pending; back out of the immediate transaction cleanly.
            tx.rollback().map_db_err("claim_next_task")?;
            return Ok(None);
        };

        let now = Utc::now();
        tx.execute(
            "UPDATE task_queue SET status = 'PROCESSING', updated_at = ?1 WHERE id = ?2",
            rusqlite::params![format_timestamp(now), task.id],
        )
        .map_db_err("claim_next_task")?;
        tx.commit().map_db_err("claim_next_task")?;

        task.status = TaskStatus::Processing;
        task.updated_at = now;
        Ok(Some(task))
    }

    /// Update a task's status and `updated_at`
    ///
    /// # Errors
    ///
    /// Returns classified database errors.
    pub fn update_task_status(&self, task_id: i64, status: TaskStatus) -> MetaDataResult<()> {
        let conn = self.pool.acquire()?;
        conn.execute(
            "UPDATE task_queue SET status = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![status.to_string(), format_timestamp(Utc::now()), task_id],
        )
        .map_db_err("update_task_status")?;
        Ok(())
    }

    /// Move a task to FAILED with an error message
    ///
    /// # Errors
    ///
    /// Returns classified database errors.
    pub fn mark_task_as_failed(&self, task_id: i64, error_message: &str) -> MetaDataResult<()> {
        let conn = self.pool.acquire()?;
        conn.execute(
            "UPDATE task_queue
             SET status = 'FAILED', error_message = ?1, updated_at = ?2
             WHERE id = ?3",
            rusqlite::params![error_message, format_timestamp(Utc::now()), task_id],
        )
        .map_db_err("mark_task_as_failed")?;
        Ok(())
    }

    /// All tasks in a given status, in claim order
    ///
    /// # Errors
    ///
    /// Returns classified database errors.
    pub fn get_tasks_by_status(&self, status: TaskStatus) -> MetaDataResult<Vec<Task>> {
        let conn = self.pool.acquire()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, task_type, file_path, status, priority, error_message,
                        created_at, updated_at
                 FROM task_queue
                 WHERE status = ?1
                 ORDER BY priority ASC, created_at ASC",
            )
            .map_db_err("get_tasks_by_status")?;
        let rows = stmt
            .query_map([status.to_string()], task_from_row)
            .map_db_err("get_tasks_by_status")?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.map_db_err("get_tasks_by_status")?);
        }
        Ok(tasks)
    }

    /// Delete terminal tasks whose `updated_at` is older than the cutoff
    ///
    /// # Errors
    ///
    /// Returns classified database errors.
    pub fn clear_completed_tasks(&self, older_than_days: i64) -> MetaDataResult<usize> {
        let conn = self.pool.acquire()?;
        let cutoff = Utc::now() - chrono::Duration::days(older_than_days);
        let deleted = conn
            .execute(
                "DELETE FROM task_queue
                 WHERE status IN ('COMPLETED', 'FAILED') AND updated_at <= ?1",
                [format_timestamp(cutoff)],
            )
            .map_db_err("clear_completed_tasks")?;
        Ok(deleted)
    }

    /// Reset tasks stranded in PROCESSING by a crash back to PENDING
    ///
    /// Run once at startup, before any worker claims. Returns the number of
    /// recovered tasks.
    ///
    /// # Errors
    ///
    /// Returns classified database errors.
    pub fn recover_stale_tasks(&self) -> MetaDataResult<usize> {
        let conn = self.pool.acquire()?;
        let recovered = conn
            .execute(
                "UPDATE task_queue SET status = 'PENDING', updated_at = ?1
                 WHERE status = 'PROCESSING'",
                [format_timestamp(Utc::now())],
            )
            .map_db_err("recover_stale_tasks")?;
        if recovered > 0 {
            info!(recovered, "reset stale PROCESSING tasks to PENDING");
        }
        Ok(recovered)
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(Task {
        id: row.get("id")?,
        task_type: row.get("task_type")?,
        file_path: row.get("file_path")?,
        status: TaskStatus::from_str(&status).map_err(text_conversion_error)?,
        priority: row.get("priority")?,
        error_message: row.get("error_message")?,
        created_at: parse_timestamp(&created_at).map_err(text_conversion_error)?,
        updated_at: parse_timestamp(&updated_at).map_err(text_conversion_error)?,
    })
}

/// Retry busy/locked failures with a short linear backoff
fn with_busy_retry<T>(mut operation: impl FnMut() -> MetaDataResult<T>) -> MetaDataResult<T> {
    let mut attempt = 0;
    loop {
        match operation() {
            Err(e) if e.is_busy() && attempt + 1 < BUSY_RETRY_ATTEMPTS => {
                attempt += 1;
                debug!(attempt, "task queue busy, retrying");
                std::thread::sleep(BUSY_RETRY_BACKOFF * attempt);
            }
            other => return other,
        }
    }
}
