//! Shared service handles for task execution
//!
//! Workers hold non-owning handles to the stores and clients; nothing here
//! owns persistent state, so any number of workers can share one bundle.

use std::sync::Arc;

use magicfolder_embeddings::EmbeddingProvider;
use magicfolder_extraction::ExtractorRegistry;
use magicfolder_meta_data::{MetadataStore, TaskQueue};

/// Everything a task needs to execute
pub struct ProcessingServices {
    pub store: Arc<MetadataStore>,
    pub queue: Arc<TaskQueue>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub extractors: Arc<ExtractorRegistry>,
}

impl ProcessingServices {
    pub fn new(
        store: Arc<MetadataStore>,
        queue: Arc<TaskQueue>,
        embedder: Arc<dyn EmbeddingProvider>,
        extractors: Arc<ExtractorRegistry>,
    ) -> Self {
        Self {
            store,
            queue,
            embedder,
            extractors,
        }
    }
}
