//! Application state for Axum handlers
//!
//! Shared service handles initialized once at startup and cloned into every
//! handler; nothing here is created per-request.

use std::sync::Arc;

use magicfolder_embeddings::EmbeddingProvider;
use magicfolder_meta_data::{MetadataStore, TaskQueue};
use magicfolder_search::SearchService;

/// Shared services behind the HTTP surface
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MetadataStore>,
    pub queue: Arc<TaskQueue>,
    pub search: Arc<SearchService>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl AppState {
    pub fn new(
        store: Arc<MetadataStore>,
        queue: Arc<TaskQueue>,
        search: Arc<SearchService>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            store,
            queue,
            search,
            embedder,
        }
    }
}
