//! Watcher semantics driven through the backend-neutral event entry point:
//! settle debouncing, dirty quiescence, ignore rules, rename/delete upkeep

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use magicfolder_common::FileType;
use magicfolder_meta_data::{
    BasicFileMetadata, ConnectionPool, MetadataStore, ProcessingStatus, TaskQueue, TaskStatus,
};
use magicfolder_watcher::{FileWatcherService, WatchConfig, WatchEvent, WatchEventKind};

const TEST_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

const SETTLE: Duration = Duration::from_millis(200);
const QUIESCE: Duration = Duration::from_millis(300);

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    queue: Arc<TaskQueue>,
    store: Arc<MetadataStore>,
    watcher: FileWatcherService,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("watch");
    fs::create_dir_all(&root).expect("create watch root");

    let pool =
        Arc::new(ConnectionPool::new(&dir.path().join("meta.db"), TEST_KEY, 4).expect("pool"));
    let store = Arc::new(MetadataStore::new(Arc::clone(&pool)).expect("store"));
    let queue = Arc::new(TaskQueue::new(Arc::clone(&pool)));

    let mut cfg = WatchConfig::new(&root);
    cfg.settle = SETTLE;
    cfg.modify_quiesce = QUIESCE;
    cfg.sweep_interval = Duration::from_millis(100);
    cfg.reindex_batch_size = 10;

    let watcher = FileWatcherService::new(cfg, Arc::clone(&queue), Arc::clone(&store));
    Fixture {
        _dir: dir,
        root,
        queue,
        store,
        watcher,
    }
}

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write file");
}

fn pending(f: &Fixture) -> Vec<magicfolder_meta_data::Task> {
    f.queue
        .get_tasks_by_status(TaskStatus::Pending)
        .expect("pending tasks")
}

#[test]
fn stable_file_is_enqueued_exactly_once_after_the_settle_window() {
    let f = fixture();
    let path = f.root.join("notes.md");
    write_file(&path, "# Title\n\nbody\n");

    f.watcher
        .handle_event(&WatchEvent::new(&path, WatchEventKind::Created));

    // Not yet aged: nothing may be enqueued.
    f.watcher.run_settle_pass();
    assert!(pending(&f).is_empty());

    std::thread::sleep(SETTLE + Duration::from_millis(100));
    f.watcher.run_settle_pass();

    let tasks = pending(&f);
    assert_eq!(tasks.len(), 1, "enqueued exactly once");
    assert_eq!(tasks[0].task_type, "PROCESS_FILE");
    assert_eq!(tasks[0].priority, 10);
    assert_eq!(tasks[0].file_path, path.display().to_string());

    // The settle map is drained; later passes add nothing.
    f.watcher.run_settle_pass();
    assert_eq!(pending(&f).len(), 1);
    assert_eq!(f.watcher.stats().files_enqueued, 1);

    // The stub was created alongside the task.
    let row = f
        .store
        .get_file_metadata(&path.display().to_string())
        .expect("lookup")
        .expect("stub row");
    assert_eq!(row.processing_status, ProcessingStatus::Queued);
}

#[test]
fn a_file_that_changes_during_its_settle_window_is_not_enqueued() {
    let f = fixture();
    let path = f.root.join("growing.txt");
    write_file(&path, "first half");

    f.watcher
        .handle_event(&WatchEvent::new(&path, WatchEventKind::Created));

    // Keep appending before the window elapses: the settle clock restarts.
    std::thread::sleep(Duration::from_millis(120));
    write_file(&path, "first half, second half");
    f.watcher.run_settle_pass();
    std::thread::sleep(Duration::from_millis(120));
    f.watcher.run_settle_pass();
    assert!(
        pending(&f).is_empty(),
        "still inside the restarted settle window"
    );

    // Once the file stops changing, one settle window later it goes out.
    std::thread::sleep(SETTLE + Duration::from_millis(100));
    f.watcher.run_settle_pass();
    assert_eq!(pending(&f).len(), 1);
}

#[test]
fn modified_files_reindex_only_after_quiescence() {
    let f = fixture();
    let path = f.root.join("edited.txt");
    write_file(&path, "version one");

    // Two modifications inside the quiesce window.
    f.watcher
        .handle_event(&WatchEvent::new(&path, WatchEventKind::Modified));
    std::thread::sleep(Duration::from_millis(100));
    f.watcher
        .handle_event(&WatchEvent::new(&path, WatchEventKind::Modified));
    assert_eq!(f.watcher.stats().files_marked_dirty, 2);

    f.watcher.run_sweep_pass();
    assert!(pending(&f).is_empty(), "not yet quiesced");

    std::thread::sleep(Duration::from_millis(150));
    f.watcher.run_sweep_pass();
    assert!(
        pending(&f).is_empty(),
        "quiesce clock counts from the last modification"
    );

    std::thread::sleep(QUIESCE);
    f.watcher.run_sweep_pass();
    let tasks = pending(&f);
    assert_eq!(tasks.len(), 1, "exactly one reindex task");
    assert_eq!(tasks[0].task_type, "REINDEX_FILE");
    assert_eq!(tasks[0].priority, 8);
}

#[test]
fn ignored_paths_never_reach_the_settle_map() {
    let f = fixture();
    for name in ["partial.tmp", ".DS_Store", "download.crdownload"] {
        let path = f.root.join(name);
        write_file(&path, "noise");
        f.watcher
            .handle_event(&WatchEvent::new(&path, WatchEventKind::Created));
    }
    // Outside the drop root entirely.
    let outside = f._dir.path().join("elsewhere.txt");
    write_file(&outside, "outside");
    f.watcher
        .handle_event(&WatchEvent::new(&outside, WatchEventKind::Created));

    assert_eq!(f.watcher.stats().events_seen, 4);

    std::thread::sleep(SETTLE + Duration::from_millis(100));
    f.watcher.run_settle_pass();
    assert!(pending(&f).is_empty());
    assert_eq!(f.watcher.stats().files_enqueued, 0);
}

#[test]
fn directory_events_are_dropped() {
    let f = fixture();
    let subdir = f.root.join("subdir");
    fs::create_dir_all(&subdir).expect("mkdir");

    f.watcher
        .handle_event(&WatchEvent::new(&subdir, WatchEventKind::Created));
    std::thread::sleep(SETTLE + Duration::from_millis(100));
    f.watcher.run_settle_pass();
    assert!(pending(&f).is_empty());
}

#[test]
fn rename_updates_the_store_row_and_settles_the_new_path() {
    let f = fixture();
    let old_path = f.root.join("a.txt");
    let new_path = f.root.join("b.txt");
    write_file(&new_path, "contents");

    // The store already knows the file under its old path.
    let now = Utc::now();
    let id = f
        .store
        .upsert_file_stub(&BasicFileMetadata {
            path: old_path.display().to_string(),
            original_path: old_path.display().to_string(),
            content_hash: String::new(),
            file_type: FileType::Text,
            file_size: 8,
            created_at: now,
            last_modified: now,
            processing_status: ProcessingStatus::Processed,
            tags: String::new(),
        })
        .expect("stub");

    let mut event = WatchEvent::new(&new_path, WatchEventKind::Renamed);
    event.old_path = Some(old_path.clone());
    f.watcher.handle_event(&event);

    let row = f
        .store
        .get_file_metadata(&new_path.display().to_string())
        .expect("lookup")
        .expect("row under new path");
    assert_eq!(row.id, id, "rename keeps the id");
    assert!(
        f.store
            .get_file_metadata(&old_path.display().to_string())
            .expect("lookup")
            .is_none(),
        "no duplicate row under the old path"
    );

    // The new path settles like a fresh arrival.
    std::thread::sleep(SETTLE + Duration::from_millis(100));
    f.watcher.run_settle_pass();
    assert_eq!(pending(&f).len(), 1);
}

#[test]
fn delete_evicts_both_maps_and_removes_the_row() {
    let f = fixture();
    let path = f.root.join("gone.txt");
    write_file(&path, "here today");

    f.watcher
        .handle_event(&WatchEvent::new(&path, WatchEventKind::Created));
    f.watcher
        .handle_event(&WatchEvent::new(&path, WatchEventKind::Modified));

    // Row exists from an earlier processing run.
    let now = Utc::now();
    f.store
        .upsert_file_stub(&BasicFileMetadata {
            path: path.display().to_string(),
            original_path: path.display().to_string(),
            content_hash: String::new(),
            file_type: FileType::Text,
            file_size: 10,
            created_at: now,
            last_modified: now,
            processing_status: ProcessingStatus::Processed,
            tags: String::new(),
        })
        .expect("stub");

    fs::remove_file(&path).expect("remove");
    f.watcher
        .handle_event(&WatchEvent::new(&path, WatchEventKind::Deleted));

    assert!(
        f.store
            .get_file_metadata(&path.display().to_string())
            .expect("lookup")
            .is_none(),
        "row removed"
    );

    std::thread::sleep(SETTLE + Duration::from_millis(100));
    f.watcher.run_settle_pass();
    std::thread::sleep(QUIESCE + Duration::from_millis(100));
    f.watcher.run_sweep_pass();
    assert!(pending(&f).is_empty(), "both maps evicted");
}

#[test]
fn overflow_triggers_a_reconciling_scan() {
    let f = fixture();
    write_file(&f.root.join("one.md"), "# One\n");
    write_file(&f.root.join("two.txt"), "two\n");
    write_file(&f.root.join("skip.tmp"), "noise");

    f.watcher
        .handle_event(&WatchEvent::new(PathBuf::new(), WatchEventKind::Overflow));

    let stats = f.watcher.stats();
    assert_eq!(stats.overflows, 1);
    assert_eq!(stats.scans_performed, 1);

    std::thread::sleep(SETTLE + Duration::from_millis(100));
    f.watcher.run_settle_pass();
    assert_eq!(pending(&f).len(), 2, "scanned files settle and enqueue");
}

#[test]
fn initial_scan_coalesces_existing_files() {
    let f = fixture();
    let nested_dir = f.root.join("nested");
    fs::create_dir_all(&nested_dir).expect("mkdir");
    write_file(&f.root.join("top.md"), "# Top\n");
    write_file(&nested_dir.join("deep.txt"), "deep\n");

    f.watcher.initial_scan();
    assert_eq!(f.watcher.stats().scans_performed, 1);

    std::thread::sleep(SETTLE + Duration::from_millis(100));
    f.watcher.run_settle_pass();
    assert_eq!(pending(&f).len(), 2, "recursive scan found both files");
}
