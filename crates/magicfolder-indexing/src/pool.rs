//! Worker pool lifecycle
//!
//! Owns N workers, starts them together, and on shutdown signals stop to
//! every worker before joining any of them, so all workers wind down
//! concurrently instead of serially.

use std::sync::Arc;

use tracing::info;

use crate::error::{IndexingError, IndexingResult};
use crate::services::ProcessingServices;
use crate::worker::Worker;

/// Fixed-size pool of background workers
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Build a pool of `num_workers` workers sharing one service bundle
    ///
    /// # Errors
    ///
    /// Returns [`IndexingError::EmptyWorkerPool`] for zero workers.
    pub fn new(num_workers: usize, services: Arc<ProcessingServices>) -> IndexingResult<Self> {
        if num_workers == 0 {
            return Err(IndexingError::EmptyWorkerPool);
        }
        let workers = (0..num_workers)
            .map(|id| Worker::new(id, Arc::clone(&services)))
            .collect();
        Ok(Self { workers })
    }

    /// Start every worker
    ///
    /// # Errors
    ///
    /// Returns the first start failure; already-started workers keep running.
    pub fn start(&mut self) -> IndexingResult<()> {
        for worker in &mut self.workers {
            worker.start()?;
        }
        info!(workers = self.workers.len(), "worker pool started");
        Ok(())
    }

    /// Stop and join every worker
    ///
    /// Stop flags are flipped on all workers first, then each thread is
    /// joined; in-flight tasks complete before their worker exits.
    pub fn stop(&mut self) {
        for worker in &self.workers {
            worker.stop();
        }
        for worker in &mut self.workers {
            worker.join();
        }
        info!("worker pool stopped");
    }

    /// Number of workers in the pool
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether the pool has no workers (never true for a constructed pool)
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}
