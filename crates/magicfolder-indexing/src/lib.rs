//! Background processing: the per-file pipeline and the worker pool that
//! drives it off the durable task queue

pub mod error;
pub mod pool;
pub mod services;
pub mod task;
pub mod worker;

pub use error::{IndexingError, IndexingResult};
pub use pool::WorkerPool;
pub use services::ProcessingServices;
pub use task::{CHUNK_UPSERT_BATCH_SIZE, TaskKind};
pub use worker::Worker;
