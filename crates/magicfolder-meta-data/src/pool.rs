//! Bounded pool of keyed database connections
//!
//! Every connection is opened with the encryption key, verified with a probe
//! query, and configured with the standard pragmas before it enters the pool.
//! `acquire` blocks on a condition variable while the pool is empty; the RAII
//! guard returns the handle on every exit path, including unwinds.

use std::path::Path;
use std::sync::{Condvar, Mutex, PoisonError};

use rusqlite::Connection;

use crate::error::{DatabaseErrorExt, MetaDataError, MetaDataResult};
use crate::keys;
use crate::schema;

#[derive(Debug)]
struct PoolState {
    connections: Vec<Connection>,
    shutting_down: bool,
}

/// Bounded pool of keyed SQLite connections
#[derive(Debug)]
pub struct ConnectionPool {
    state: Mutex<PoolState>,
    available: Condvar,
}

impl ConnectionPool {
    /// Open `pool_size` keyed connections and initialize the schema
    ///
    /// # Errors
    ///
    /// Returns [`MetaDataError::Validation`] for a zero pool size or malformed
    /// key, [`MetaDataError::KeyRejected`] when the key fails the probe query,
    /// and classified database errors for open/pragma/schema failures.
    pub fn new(db_path: &Path, key_hex: &str, pool_size: usize) -> MetaDataResult<Self> {
        if pool_size == 0 {
            return Err(MetaDataError::Validation(
                "connection pool size must be greater than 0".to_string(),
            ));
        }
        if !keys::is_valid_key_hex(key_hex) {
            return Err(MetaDataError::Validation(
                "database key must be a 64-character hex string".to_string(),
            ));
        }
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MetaDataError::Validation(format!(
                        "failed to create database directory '{}': {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let mut connections = Vec::with_capacity(pool_size);
        for i in 0..pool_size {
            let conn = open_keyed_connection(db_path, key_hex)?;
            if i == 0 {
                schema::initialize_schema(&conn)?;
            }
            connections.push(conn);
        }

        Ok(Self {
            state: Mutex::new(PoolState {
                connections,
                shutting_down: false,
            }),
            available: Condvar::new(),
        })
    }

    /// Borrow a connection, blocking until one is free
    ///
    /// # Errors
    ///
    /// Returns [`MetaDataError::PoolClosed`] once [`Self::shutdown`] has run.
    pub fn acquire(&self) -> MetaDataResult<PooledConnection<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if state.shutting_down {
                return Err(MetaDataError::PoolClosed);
            }
            if let Some(conn) = state.connections.pop() {
                return Ok(PooledConnection {
                    pool: self,
                    conn: Some(conn),
                });
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Drain the pool and fail all current and future acquires
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.shutting_down = true;
        state.connections.clear();
        drop(state);
        self.available.notify_all();
    }

    fn release(&self, conn: Connection) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.shutting_down {
            state.connections.push(conn);
        }
        drop(state);
        self.available.notify_one();
    }
}

/// RAII guard for a borrowed connection
///
/// Dereferences to [`rusqlite::Connection`]; the handle goes back to the pool
/// when the guard drops.
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl std::ops::Deref for PooledConnection<'_> {
    type Target = Connection;

    // Invariant: `conn` is only None after drop.
    #[allow(clippy::unwrap_used)]
    fn deref(&self) -> &Connection {
        self.conn.as_ref().unwrap()
    }
}

impl std::ops::DerefMut for PooledConnection<'_> {
    #[allow(clippy::unwrap_used)]
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().unwrap()
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

/// Open one connection: key it, verify the key, apply pragmas
fn open_keyed_connection(db_path: &Path, key_hex: &str) -> MetaDataResult<Connection> {
    let conn = Connection::open(db_path).map_db_err("open_database")?;

    // SQLCipher raw-key form; key_hex is validated hex so the literal is safe.
    conn.execute_batch(&format!("PRAGMA key = \"x'{key_hex}'\";"))
        .map_db_err("apply_database_key")?;

    // Probe before any real query so a wrong key fails here, not mid-operation.
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|e| MetaDataError::KeyRejected(e.to_string()))?;

    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;",
    )
    .map_db_err("apply_pragmas")?;

    Ok(conn)
}
