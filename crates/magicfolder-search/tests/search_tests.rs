//! Search service against a real store and the deterministic mock embedder

use std::sync::Arc;

use chrono::Utc;
use magicfolder_common::{FileType, codec};
use magicfolder_embeddings::EmbeddingProvider;
use magicfolder_embeddings::mock::MockEmbeddingProvider;
use magicfolder_meta_data::{
    BasicFileMetadata, ConnectionPool, MetadataStore, ProcessedChunk, ProcessingStatus, VECTOR_DIM,
};
use magicfolder_search::SearchService;

const TEST_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

struct Fixture {
    _dir: tempfile::TempDir,
    store: Arc<MetadataStore>,
    embedder: Arc<MockEmbeddingProvider>,
    search: SearchService,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool =
        Arc::new(ConnectionPool::new(&dir.path().join("meta.db"), TEST_KEY, 4).expect("pool"));
    let store = Arc::new(MetadataStore::new(Arc::clone(&pool)).expect("store"));
    let embedder = Arc::new(MockEmbeddingProvider::new(VECTOR_DIM));
    let search = SearchService::new(
        Arc::clone(&store),
        Arc::clone(&embedder) as Arc<dyn EmbeddingProvider>,
    );
    Fixture {
        _dir: dir,
        store,
        embedder,
        search,
    }
}

fn stub(path: &str) -> BasicFileMetadata {
    let now = Utc::now();
    BasicFileMetadata {
        path: path.to_string(),
        original_path: path.to_string(),
        content_hash: String::new(),
        file_type: FileType::Text,
        file_size: 1,
        created_at: now,
        last_modified: now,
        processing_status: ProcessingStatus::Processed,
        tags: String::new(),
    }
}

/// Store a file whose summary vector is the mock embedding of `text`
fn index_file(f: &Fixture, path: &str, text: &str) -> i64 {
    let id = f.store.upsert_file_stub(&stub(path)).expect("stub");
    let vector = f.embedder.embedding_for(text);
    f.store
        .update_file_ai_analysis(id, Some(&vector), "", "", ProcessingStatus::Processed)
        .expect("analysis");
    id
}

#[test]
fn empty_store_returns_empty_results_without_error() {
    let f = fixture();
    let response = f.search.search("anything at all", 3).expect("search");
    assert!(response.file_results.is_empty());
    assert!(response.chunk_results.is_empty());
}

#[test]
fn query_matching_a_stored_vector_ranks_that_file_first() {
    let f = fixture();
    let mut ids = Vec::new();
    for i in 0..10 {
        ids.push(index_file(
            &f,
            &format!("/watch/file{i}.txt"),
            &format!("document number {i}"),
        ));
    }
    f.store.rebuild_file_index().expect("rebuild");

    // The mock embeds the query exactly like the stored text.
    let hits = f.search.search_files("document number 0", 1).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, ids[0]);
    assert!(hits[0].distance < 0.1);
}

#[test]
fn search_returns_decompressed_chunk_content_for_matched_files() {
    let f = fixture();
    let id = index_file(&f, "/watch/notes.txt", "meeting notes");

    let chunk_text = "notes from the tuesday meeting";
    f.store
        .upsert_chunk_metadata(
            id,
            &[ProcessedChunk {
                chunk_index: 0,
                compressed_content: codec::compress(chunk_text.as_bytes()).expect("compress"),
                vector: f.embedder.embedding_for(chunk_text),
            }],
        )
        .expect("chunk");
    f.store.rebuild_file_index().expect("rebuild");

    let response = f.search.search("meeting notes", 3).expect("search");
    assert_eq!(response.file_results.len(), 1);
    assert_eq!(response.chunk_results.len(), 1);

    let chunk = &response.chunk_results[0];
    assert_eq!(chunk.file_id, id);
    assert_eq!(chunk.chunk_index, 0);
    assert_eq!(chunk.content, chunk_text, "payload decompressed");
}

#[test]
fn chunk_hits_are_restricted_to_the_matched_files() {
    let f = fixture();
    let near = index_file(&f, "/watch/near.txt", "rust concurrency patterns");
    let far = index_file(&f, "/watch/far.txt", "completely unrelated topic");

    for (file_id, text) in [
        (near, "channels and mutexes in rust"),
        (far, "rust concurrency patterns"), // decoy: right text, wrong file
    ] {
        f.store
            .upsert_chunk_metadata(
                file_id,
                &[ProcessedChunk {
                    chunk_index: 0,
                    compressed_content: codec::compress(text.as_bytes()).expect("compress"),
                    vector: f.embedder.embedding_for(text),
                }],
            )
            .expect("chunk");
    }
    f.store.rebuild_file_index().expect("rebuild");

    let response = f
        .search
        .search("rust concurrency patterns", 1)
        .expect("search");
    assert_eq!(response.file_results.len(), 1);
    assert_eq!(response.file_results[0].id, near);
    assert!(
        response.chunk_results.iter().all(|c| c.file_id == near),
        "chunks come only from the matched files"
    );
}

#[test]
fn embedding_failure_surfaces_as_a_search_error() {
    let f = fixture();
    index_file(&f, "/watch/a.txt", "something");
    f.store.rebuild_file_index().expect("rebuild");

    f.embedder.fail_requests();
    let err = f.search.search("query", 3).unwrap_err();
    assert!(matches!(
        err,
        magicfolder_search::SearchError::Embedding(_)
    ));
}
