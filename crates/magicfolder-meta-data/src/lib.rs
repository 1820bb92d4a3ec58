//! Magic Folder data layer: encrypted SQLite state plus the in-memory ANN index
//!
//! The relational store is the source of truth for files, chunks, and queued
//! tasks; the ANN index is derived state rebuilt from it. All access goes
//! through a bounded pool of keyed connections.

// Module declarations
pub mod ann;
pub mod error;
pub mod keys;
pub mod models;
pub mod pool;
pub mod schema;
pub mod store;
pub mod task_queue;
pub mod vector;

// Public exports
pub use ann::{AnnHit, AnnIndex};
pub use error::{DbErrorKind, MetaDataError, MetaDataResult};
pub use keys::DbKeyProvider;
pub use models::{
    BasicFileMetadata, ChunkSearchResult, FileMetadata, FileSearchResult, ProcessedChunk,
    ProcessingStatus, Task, TaskStatus, PROCESS_FILE_TASK, REINDEX_FILE_TASK,
};
pub use pool::{ConnectionPool, PooledConnection};
pub use store::MetadataStore;
pub use task_queue::{TaskEnqueue, TaskQueue};
pub use vector::VECTOR_DIM;
