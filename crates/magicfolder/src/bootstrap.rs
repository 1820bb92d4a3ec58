//! Daemon wiring: key, pool, stores, clients
//!
//! Bootstrap order matters: the key comes first, stale tasks are recovered
//! before any worker can claim, and the ANN index is built by the store
//! constructor from whatever the database already holds.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use magicfolder_config::ApplicationConfig;
use magicfolder_embeddings::{EmbeddingProvider, OllamaClient};
use magicfolder_extraction::ExtractorRegistry;
use magicfolder_indexing::ProcessingServices;
use magicfolder_meta_data::{ConnectionPool, DbKeyProvider, MetadataStore, TaskQueue};
use magicfolder_search::SearchService;
use magicfolder_watcher::WatchConfig;

/// Extra pool connections beyond the workers, for the watcher, the search
/// path, and the HTTP handlers
const POOL_HEADROOM: usize = 4;

/// Shared application services, fully wired
pub struct App {
    pub pool: Arc<ConnectionPool>,
    pub store: Arc<MetadataStore>,
    pub queue: Arc<TaskQueue>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub search: Arc<SearchService>,
    pub services: Arc<ProcessingServices>,
}

impl App {
    /// Wire everything up from validated configuration
    ///
    /// # Errors
    ///
    /// Fails when the secret store, database, or HTTP client cannot be
    /// initialized; all are fatal at startup.
    pub fn bootstrap(config: &ApplicationConfig) -> anyhow::Result<Self> {
        let key = DbKeyProvider::new()
            .get_database_key()
            .context("failed to obtain database key")?;

        let pool_size = config.num_workers + POOL_HEADROOM;
        let pool = Arc::new(
            ConnectionPool::new(Path::new(&config.metadata_db_path), &key, pool_size)
                .context("failed to open metadata database")?,
        );

        let queue = Arc::new(TaskQueue::new(Arc::clone(&pool)));
        let recovered = queue
            .recover_stale_tasks()
            .context("failed to recover stale tasks")?;
        if recovered > 0 {
            info!(recovered, "recovered tasks from a previous run");
        }

        let store = Arc::new(
            MetadataStore::new(Arc::clone(&pool)).context("failed to initialize metadata store")?,
        );

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
            OllamaClient::new(&config.ollama_url, &config.embedding_model)
                .context("failed to construct embedding client")?,
        );
        let extractors = Arc::new(ExtractorRegistry::new());
        let search = Arc::new(SearchService::new(Arc::clone(&store), Arc::clone(&embedder)));
        let services = Arc::new(ProcessingServices::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            Arc::clone(&embedder),
            Arc::clone(&extractors),
        ));

        Ok(Self {
            pool,
            store,
            queue,
            embedder,
            search,
            services,
        })
    }

    /// Watcher configuration derived from the application config
    pub fn watch_config(&self, config: &ApplicationConfig) -> WatchConfig {
        let mut watch = WatchConfig::new(&config.watch_directory);
        watch.settle = config.settle_window();
        watch.modify_quiesce = config.modify_quiesce_window();
        watch
    }
}
