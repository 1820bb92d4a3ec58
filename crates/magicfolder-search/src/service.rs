//! The search service

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use magicfolder_common::codec;
use magicfolder_embeddings::EmbeddingProvider;
use magicfolder_meta_data::{FileSearchResult, MetadataStore};

use crate::error::SearchResult;

/// A chunk hit with its payload decompressed for the caller
#[derive(Debug, Clone, Serialize)]
pub struct ChunkHit {
    pub id: i64,
    pub distance: f32,
    pub file_id: i64,
    pub chunk_index: i64,
    pub content: String,
}

/// Combined result of a two-granularity search
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub file_results: Vec<FileSearchResult>,
    pub chunk_results: Vec<ChunkHit>,
}

/// Query orchestration over the store and the embedding provider
pub struct SearchService {
    store: Arc<MetadataStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SearchService {
    pub fn new(store: Arc<MetadataStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Top-k file hits for a natural-language query
    ///
    /// # Errors
    ///
    /// Returns [`crate::SearchError`] when the embedding client or the store
    /// fails; an empty store yields an empty result, not an error.
    pub fn search_files(&self, query: &str, k: usize) -> SearchResult<Vec<FileSearchResult>> {
        let query_vector = self.embedder.get_embedding(query)?;
        Ok(self.store.search_similar_files(&query_vector, k)?)
    }

    /// Top-k file hits plus top-k chunk hits restricted to those files
    ///
    /// Both granularities use the same query embedding. Chunk payloads are
    /// decompressed before they reach the caller.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SearchError`] when the embedding client, store, or
    /// payload codec fails.
    pub fn search(&self, query: &str, k: usize) -> SearchResult<SearchResponse> {
        let query_vector = self.embedder.get_embedding(query)?;

        let file_results = self.store.search_similar_files(&query_vector, k)?;
        let file_ids: Vec<i64> = file_results.iter().map(|hit| hit.id).collect();
        let chunk_hits = self
            .store
            .search_similar_chunks(&file_ids, &query_vector, k)?;

        let mut chunk_results = Vec::with_capacity(chunk_hits.len());
        for hit in chunk_hits {
            let payload = codec::decompress(&hit.compressed_content)?;
            chunk_results.push(ChunkHit {
                id: hit.id,
                distance: hit.distance,
                file_id: hit.file_id,
                chunk_index: hit.chunk_index,
                content: String::from_utf8_lossy(&payload).into_owned(),
            });
        }

        debug!(
            query,
            files = file_results.len(),
            chunks = chunk_results.len(),
            "search complete"
        );
        Ok(SearchResponse {
            file_results,
            chunk_results,
        })
    }
}
