//! Deterministic in-process embedding provider for tests
//!
//! Produces a stable pseudo-vector per input text so pipeline and search
//! tests run without a live server. Identical text always embeds to the
//! identical vector; distinct texts diverge.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::EmbeddingProvider;

/// Test double for [`EmbeddingProvider`]
pub struct MockEmbeddingProvider {
    dimensions: usize,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    /// Provider that yields vectors of the given dimensionality
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make subsequent `get_embedding` calls fail, for error-path tests
    pub fn fail_requests(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// How many embeddings have been requested
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The vector this mock returns for a given text
    pub fn embedding_for(&self, text: &str) -> Vec<f32> {
        (0..self.dimensions)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                i.hash(&mut hasher);
                // Map the hash into [-1, 1) deterministically.
                let raw = hasher.finish() % 2000;
                (raw as f32 / 1000.0) - 1.0
            })
            .collect()
    }
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn get_embedding(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Server {
                status: 503,
                body: "mock failure".to_string(),
            });
        }
        Ok(self.embedding_for(text))
    }

    fn is_server_available(&self) -> bool {
        !self.fail.load(Ordering::SeqCst)
    }
}
