//! End-to-end: a file dropped into the watch root flows through settle,
//! queue, worker, and store, ending processed with chunks and a unit-norm
//! summary vector

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use magicfolder_embeddings::EmbeddingProvider;
use magicfolder_embeddings::mock::MockEmbeddingProvider;
use magicfolder_extraction::ExtractorRegistry;
use magicfolder_indexing::{ProcessingServices, Worker};
use magicfolder_meta_data::{
    ConnectionPool, MetadataStore, ProcessingStatus, TaskQueue, TaskStatus, VECTOR_DIM,
};
use magicfolder_watcher::{FileWatcherService, WatchConfig, WatchEvent, WatchEventKind};

const TEST_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
const SETTLE: Duration = Duration::from_millis(200);

#[test]
fn dropped_file_is_settled_queued_processed_and_searchable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let watch_root = dir.path().join("watch");
    fs::create_dir_all(&watch_root).expect("watch root");

    let pool =
        Arc::new(ConnectionPool::new(&dir.path().join("meta.db"), TEST_KEY, 4).expect("pool"));
    let store = Arc::new(MetadataStore::new(Arc::clone(&pool)).expect("store"));
    let queue = Arc::new(TaskQueue::new(Arc::clone(&pool)));
    let embedder = Arc::new(MockEmbeddingProvider::new(VECTOR_DIM));
    let services = Arc::new(ProcessingServices::new(
        Arc::clone(&store),
        Arc::clone(&queue),
        Arc::clone(&embedder) as Arc<dyn EmbeddingProvider>,
        Arc::new(ExtractorRegistry::new()),
    ));

    let mut cfg = WatchConfig::new(&watch_root);
    cfg.settle = SETTLE;
    let watcher = FileWatcherService::new(cfg, Arc::clone(&queue), Arc::clone(&store));

    // Drop the file and let the watcher observe it.
    let notes = watch_root.join("notes.md");
    fs::write(&notes, "# Title\n\nbody\n").expect("write notes");
    watcher.handle_event(&WatchEvent::new(&notes, WatchEventKind::Created));

    // Before the settle window: no task may exist.
    watcher.run_settle_pass();
    assert!(
        queue
            .get_tasks_by_status(TaskStatus::Pending)
            .expect("pending")
            .is_empty()
    );

    // After the settle window: exactly one PROCESS_FILE task.
    std::thread::sleep(SETTLE + Duration::from_millis(100));
    watcher.run_settle_pass();
    let pending = queue
        .get_tasks_by_status(TaskStatus::Pending)
        .expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].task_type, "PROCESS_FILE");

    // One worker cycle finishes the file.
    let worker = Worker::new(0, Arc::clone(&services));
    assert!(worker.run_one_task().expect("cycle"));

    let row = store
        .get_file_metadata(&notes.display().to_string())
        .expect("lookup")
        .expect("row");
    assert_eq!(row.processing_status, ProcessingStatus::Processed);

    // At least one chunk, starting at index 0.
    let chunk_count: i64 = {
        let conn = pool.acquire().expect("acquire");
        conn.query_row(
            "SELECT count(*) FROM chunks WHERE file_id = ?1 AND chunk_index = 0",
            [row.id],
            |r| r.get(0),
        )
        .expect("count")
    };
    assert!(chunk_count >= 1);

    // Summary vector is L2-unit-norm within tolerance.
    let vector = row.summary_vector.expect("summary vector");
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-3);

    // And the file is findable through the rebuilt index.
    let hits = store
        .search_similar_files(&vector, 1)
        .expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, row.id);
}
