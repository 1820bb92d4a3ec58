//! Long-lived claim-and-execute worker
//!
//! A worker owns one OS thread. Its loop claims the next pending task,
//! executes the pipeline, and sleeps briefly when the queue is empty. Stop is
//! cooperative: the flag is checked at iteration boundaries and the current
//! task always runs to completion. Dropping a worker joins its thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info};

use magicfolder_meta_data::{ProcessingStatus, Task, TaskStatus};

use crate::error::{IndexingError, IndexingResult};
use crate::services::ProcessingServices;
use crate::task::TaskKind;

/// How long the loop idles when the queue comes back empty
const IDLE_SLEEP: Duration = Duration::from_secs(5);

/// Idle sleeping happens in slices so a stop request is honored promptly
const SLEEP_SLICE: Duration = Duration::from_millis(250);

/// One background processing thread
pub struct Worker {
    worker_id: usize,
    services: Arc<ProcessingServices>,
    should_stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Worker {
    pub fn new(worker_id: usize, services: Arc<ProcessingServices>) -> Self {
        Self {
            worker_id,
            services,
            should_stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Launch the run loop on a new thread
    ///
    /// # Errors
    ///
    /// Returns [`IndexingError::WorkerAlreadyRunning`] when the thread is
    /// already up, and [`IndexingError::Spawn`] if the OS refuses the thread.
    pub fn start(&mut self) -> IndexingResult<()> {
        if self.handle.is_some() {
            return Err(IndexingError::WorkerAlreadyRunning(self.worker_id));
        }
        self.should_stop.store(false, Ordering::SeqCst);

        let worker_id = self.worker_id;
        let services = Arc::clone(&self.services);
        let should_stop = Arc::clone(&self.should_stop);
        let handle = std::thread::Builder::new()
            .name(format!("magicfolder-worker-{worker_id}"))
            .spawn(move || run_loop(worker_id, &services, &should_stop))
            .map_err(IndexingError::Spawn)?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Signal the loop to exit after its current task; does not block
    pub fn stop(&self) {
        self.should_stop.store(true, Ordering::SeqCst);
    }

    /// Wait for the thread to exit
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(worker_id = self.worker_id, "worker thread panicked");
            }
        }
    }

    /// Claim and execute at most one task synchronously
    ///
    /// Returns whether a task was found. Used by tests and the one-shot CLI
    /// path; the task's own failures are recorded, not returned.
    ///
    /// # Errors
    ///
    /// Returns data-layer errors from the claim itself.
    pub fn run_one_task(&self) -> IndexingResult<bool> {
        match self.services.queue.fetch_and_claim_next_task()? {
            Some(task) => {
                execute_claimed_task(self.worker_id, &self.services, &task);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

fn run_loop(worker_id: usize, services: &ProcessingServices, should_stop: &AtomicBool) {
    info!(worker_id, "worker run loop started");

    while !should_stop.load(Ordering::SeqCst) {
        match services.queue.fetch_and_claim_next_task() {
            Ok(Some(task)) => {
                debug!(worker_id, task_id = task.id, path = %task.file_path, "task claimed");
                execute_claimed_task(worker_id, services, &task);
            }
            Ok(None) => sleep_unless_stopped(should_stop, IDLE_SLEEP),
            Err(e) => {
                // A single claim failure must not take the thread down.
                error!(worker_id, error = %e, "failed to claim next task");
                sleep_unless_stopped(should_stop, Duration::from_secs(1));
            }
        }
    }

    info!(worker_id, "worker run loop terminated");
}

/// Run one claimed task and record the outcome on both tables
fn execute_claimed_task(worker_id: usize, services: &ProcessingServices, task: &Task) {
    let task_id = task.id;
    let result = TaskKind::from_task(task).and_then(|kind| {
        let progress = move |fraction: f32, message: &str| {
            debug!(worker_id, task_id, fraction, message, "progress");
        };
        kind.execute(services, &progress)
    });

    match result {
        Ok(()) => {
            if let Err(e) = services
                .queue
                .update_task_status(task.id, TaskStatus::Completed)
            {
                error!(worker_id, task_id = task.id, error = %e, "failed to complete task");
            }
        }
        Err(e) => {
            error!(
                worker_id,
                task_id = task.id,
                path = %task.file_path,
                error = %e,
                "task failed"
            );
            // Record the failure on the file row (clearing any stale summary
            // vector) and on the task row; both are best-effort.
            if let Ok(Some(metadata)) = services.store.get_file_metadata(&task.file_path) {
                if let Err(store_err) = services.store.update_file_ai_analysis(
                    metadata.id,
                    None,
                    "",
                    "",
                    ProcessingStatus::Failed,
                ) {
                    error!(worker_id, error = %store_err, "failed to mark file FAILED");
                }
            }
            if let Err(queue_err) = services.queue.mark_task_as_failed(task.id, &e.to_string()) {
                error!(worker_id, error = %queue_err, "failed to mark task FAILED");
            }
        }
    }
}

fn sleep_unless_stopped(should_stop: &AtomicBool, total: Duration) {
    let mut remaining = total;
    while !remaining.is_zero() && !should_stop.load(Ordering::SeqCst) {
        let slice = remaining.min(SLEEP_SLICE);
        std::thread::sleep(slice);
        remaining -= slice;
    }
}
