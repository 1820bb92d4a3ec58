//! Per-file processing pipeline
//!
//! One task processes one file end to end: extract and hash, embed each
//! chunk, compress and persist in batches, derive the document summary
//! vector, and refresh the ANN index. Progress is reported through a
//! `(fraction, message)` callback.

use std::path::Path;

use tracing::debug;

use magicfolder_common::codec;
use magicfolder_meta_data::{
    PROCESS_FILE_TASK, ProcessedChunk, ProcessingStatus, REINDEX_FILE_TASK, Task, VECTOR_DIM,
};

use crate::error::{IndexingError, IndexingResult};
use crate::services::ProcessingServices;

/// Chunks are flushed to the store in batches of this size
pub const CHUNK_UPSERT_BATCH_SIZE: usize = 64;

/// Progress callback: fraction in [0, 1] plus a human-readable message
pub type ProgressFn = dyn Fn(f32, &str) + Send + Sync;

/// The work a claimed task row describes
///
/// A tagged variant instead of trait objects keeps dispatch exhaustive and
/// the services free of back-references to tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Full processing of a newly observed file
    ProcessFile { path: String },
    /// Reprocessing of a modified file; currently the same pipeline at a
    /// different enqueue priority
    ReindexFile { path: String },
}

impl TaskKind {
    /// Map a queue row onto a task kind
    ///
    /// # Errors
    ///
    /// Returns [`IndexingError::UnknownTaskType`] for an unrecognized tag.
    pub fn from_task(task: &Task) -> IndexingResult<Self> {
        match task.task_type.as_str() {
            PROCESS_FILE_TASK => Ok(Self::ProcessFile {
                path: task.file_path.clone(),
            }),
            REINDEX_FILE_TASK => Ok(Self::ReindexFile {
                path: task.file_path.clone(),
            }),
            other => Err(IndexingError::UnknownTaskType(other.to_string())),
        }
    }

    /// Execute the pipeline against the shared services
    ///
    /// # Errors
    ///
    /// Propagates the first failure from any stage; the caller owns the
    /// FAILED-state bookkeeping for the file row and the task row.
    pub fn execute(
        &self,
        services: &ProcessingServices,
        on_progress: &ProgressFn,
    ) -> IndexingResult<()> {
        match self {
            Self::ProcessFile { path } | Self::ReindexFile { path } => {
                process_file(path, services, on_progress)
            }
        }
    }
}

fn process_file(
    path: &str,
    services: &ProcessingServices,
    on_progress: &ProgressFn,
) -> IndexingResult<()> {
    on_progress(0.0, "Starting processing");

    // 1. Resolve the stub; a task without one is fatal for this task.
    let metadata = services
        .store
        .get_file_metadata(path)?
        .ok_or_else(|| IndexingError::MissingFileStub(path.to_string()))?;
    let file_id = metadata.id;

    services
        .store
        .update_file_processing_status(file_id, ProcessingStatus::Processing)?;
    on_progress(0.05, "File metadata loaded");

    // 2. One read yields hash and chunks together.
    let extractor = services.extractors.get_extractor_for(Path::new(path))?;
    let extracted = extractor.extract_with_hash(Path::new(path))?;
    services
        .store
        .update_file_hash(file_id, &extracted.content_hash)?;
    on_progress(0.1, "Content extracted");

    // 3. Embed, compress, and persist chunk batches; accumulate the
    //    document-level sum as we go.
    let total_chunks = extracted.chunks.len();
    let mut document_embedding = vec![0.0_f32; VECTOR_DIM];
    let mut batch: Vec<ProcessedChunk> = Vec::with_capacity(CHUNK_UPSERT_BATCH_SIZE);

    for (i, chunk) in extracted.chunks.iter().enumerate() {
        let vector = services.embedder.get_embedding(&chunk.content)?;
        if vector.is_empty() {
            return Err(magicfolder_embeddings::EmbeddingError::EmptyEmbedding.into());
        }

        for (accumulator, value) in document_embedding.iter_mut().zip(&vector) {
            *accumulator += value;
        }

        batch.push(ProcessedChunk {
            chunk_index: chunk.chunk_index as i64,
            compressed_content: codec::compress(chunk.content.as_bytes())?,
            vector,
        });
        if batch.len() >= CHUNK_UPSERT_BATCH_SIZE {
            services.store.upsert_chunk_metadata(file_id, &batch)?;
            batch.clear();
        }

        if i % 10 == 0 {
            let fraction = 0.1 + 0.8 * ((i + 1) as f32 / total_chunks as f32);
            on_progress(
                fraction,
                &format!("Embedding chunk {} of {total_chunks}", i + 1),
            );
        }
    }
    if !batch.is_empty() {
        services.store.upsert_chunk_metadata(file_id, &batch)?;
    }

    // 4. Document summary vector: L2-normalized sum of chunk vectors. A file
    //    with no chunks is just marked processed.
    if total_chunks == 0 {
        services
            .store
            .update_file_processing_status(file_id, ProcessingStatus::Processed)?;
        on_progress(1.0, "Processing complete (no content)");
        return Ok(());
    }

    normalize_in_place(&mut document_embedding);
    services.store.update_file_ai_analysis(
        file_id,
        Some(&document_embedding),
        "",
        "",
        ProcessingStatus::Processed,
    )?;
    on_progress(0.95, "Document summary embedding stored");

    services.store.rebuild_file_index()?;
    debug!(file_id, total_chunks, "file processed");
    on_progress(1.0, "Processing complete");
    Ok(())
}

/// L2-normalize; a zero vector is left untouched
fn normalize_in_place(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_produces_a_unit_vector() {
        let mut vector = vec![3.0, 4.0];
        normalize_in_place(&mut vector);
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_stays_zero() {
        let mut vector = vec![0.0_f32; 8];
        normalize_in_place(&mut vector);
        assert!(vector.iter().all(|v| *v == 0.0));
    }
}
