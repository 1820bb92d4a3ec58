//! Indexing error types

use thiserror::Error;

/// Result type alias for indexing operations
pub type IndexingResult<T> = Result<T, IndexingError>;

/// Errors from the processing pipeline and worker machinery
#[derive(Debug, Error)]
pub enum IndexingError {
    /// Data-layer failure
    #[error(transparent)]
    MetaData(#[from] magicfolder_meta_data::MetaDataError),

    /// Extraction failure (unreadable file, unsupported format)
    #[error(transparent)]
    Extraction(#[from] magicfolder_extraction::ExtractorError),

    /// Embedding server failure
    #[error(transparent)]
    Embedding(#[from] magicfolder_embeddings::EmbeddingError),

    /// Chunk payload compression failure
    #[error(transparent)]
    Codec(#[from] magicfolder_common::CodecError),

    /// No file stub exists for the task's path
    #[error("could not find file metadata for path: {0}")]
    MissingFileStub(String),

    /// A task row carries a type no pipeline handles
    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    /// `start` was called on a worker whose thread is already running
    #[error("worker {0} is already running")]
    WorkerAlreadyRunning(usize),

    /// The worker pool was constructed with zero workers
    #[error("worker pool must have at least one worker")]
    EmptyWorkerPool,

    /// The worker thread could not be spawned
    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),
}
