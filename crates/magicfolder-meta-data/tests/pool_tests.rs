//! Connection pool behavior: blocking acquire, shutdown, key verification

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use magicfolder_meta_data::{ConnectionPool, MetaDataError};

const TEST_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
const OTHER_KEY: &str = "ffeeddccbbaa99887766554433221100ffeeddccbbaa99887766554433221100";

fn temp_pool(dir: &tempfile::TempDir, size: usize) -> ConnectionPool {
    ConnectionPool::new(&dir.path().join("meta.db"), TEST_KEY, size).expect("pool")
}

#[test]
fn zero_sized_pool_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = ConnectionPool::new(&dir.path().join("meta.db"), TEST_KEY, 0).unwrap_err();
    assert!(matches!(err, MetaDataError::Validation(_)));
}

#[test]
fn malformed_key_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = ConnectionPool::new(&dir.path().join("meta.db"), "not-a-key", 1).unwrap_err();
    assert!(matches!(err, MetaDataError::Validation(_)));
}

#[test]
fn acquire_blocks_until_a_connection_is_released() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = Arc::new(temp_pool(&dir, 1));

    let guard = pool.acquire().expect("first acquire");

    let acquired = Arc::new(AtomicBool::new(false));
    let waiter = {
        let pool = Arc::clone(&pool);
        let acquired = Arc::clone(&acquired);
        std::thread::spawn(move || {
            let _guard = pool.acquire().expect("second acquire");
            acquired.store(true, Ordering::SeqCst);
        })
    };

    // The waiter cannot make progress while we hold the only handle.
    std::thread::sleep(Duration::from_millis(100));
    assert!(!acquired.load(Ordering::SeqCst));

    drop(guard);
    waiter.join().expect("join waiter");
    assert!(acquired.load(Ordering::SeqCst));
}

#[test]
fn shutdown_wakes_waiters_and_fails_future_acquires() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = Arc::new(temp_pool(&dir, 1));

    let guard = pool.acquire().expect("acquire");
    let waiter = {
        let pool = Arc::clone(&pool);
        std::thread::spawn(move || pool.acquire().map(|_| ()))
    };
    std::thread::sleep(Duration::from_millis(50));

    pool.shutdown();
    let waited = waiter.join().expect("join waiter");
    assert!(matches!(waited, Err(MetaDataError::PoolClosed)));

    drop(guard);
    assert!(matches!(pool.acquire(), Err(MetaDataError::PoolClosed)));
}

#[test]
fn wrong_key_fails_before_first_real_query() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("meta.db");

    let pool = ConnectionPool::new(&db_path, TEST_KEY, 1).expect("create with key");
    drop(pool);

    let err = ConnectionPool::new(&db_path, OTHER_KEY, 1).unwrap_err();
    assert!(matches!(err, MetaDataError::KeyRejected(_)));
}

#[test]
fn reopening_with_the_same_key_succeeds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("meta.db");

    drop(ConnectionPool::new(&db_path, TEST_KEY, 1).expect("first open"));
    let pool = ConnectionPool::new(&db_path, TEST_KEY, 2).expect("second open");
    let guard = pool.acquire().expect("acquire");
    let count: i64 = guard
        .query_row("SELECT count(*) FROM files", [], |row| row.get(0))
        .expect("query");
    assert_eq!(count, 0);
}
