//! SQLite-based desired-state store.
//!
//! Durable record of how many workers should exist, surviving controller
//! restarts. A single row; writes are idempotent overwrites.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::debug;

/// Errors from desired-state store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// SQLite desired-state store.
pub struct DesiredStateStore {
    conn: Mutex<Connection>,
}

impl DesiredStateStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.lock().unwrap().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS desired_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                worker_count INTEGER,
                updated_at TEXT
            );

            INSERT OR IGNORE INTO desired_state (id) VALUES (1);
            "#,
        )?;

        debug!("Desired-state schema initialized");
        Ok(())
    }

    /// Persist the desired worker count.
    pub fn write_worker_count(&self, count: u32) -> Result<(), StoreError> {
        self.conn.lock().unwrap().execute(
            "UPDATE desired_state SET worker_count = ?1, updated_at = ?2 WHERE id = 1",
            params![count, Utc::now().to_rfc3339()],
        )?;

        debug!(count, "Persisted desired worker count");
        Ok(())
    }

    /// Read the desired worker count, or `None` if never written.
    pub fn read_worker_count(&self) -> Result<Option<u32>, StoreError> {
        let count = self.conn.lock().unwrap().query_row(
            "SELECT worker_count FROM desired_state WHERE id = 1",
            [],
            |row| row.get::<_, Option<u32>>(0),
        )?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_before_first_write() {
        let store = DesiredStateStore::open_in_memory().unwrap();
        assert_eq!(store.read_worker_count().unwrap(), None);
    }

    #[test]
    fn test_write_then_read() {
        let store = DesiredStateStore::open_in_memory().unwrap();
        store.write_worker_count(4).unwrap();
        assert_eq!(store.read_worker_count().unwrap(), Some(4));
    }

    #[test]
    fn test_write_is_idempotent_overwrite() {
        let store = DesiredStateStore::open_in_memory().unwrap();
        store.write_worker_count(4).unwrap();
        store.write_worker_count(4).unwrap();
        store.write_worker_count(5).unwrap();
        assert_eq!(store.read_worker_count().unwrap(), Some(5));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autoscaler.db");

        {
            let store = DesiredStateStore::open(&path).unwrap();
            store.write_worker_count(7).unwrap();
        }

        let store = DesiredStateStore::open(&path).unwrap();
        assert_eq!(store.read_worker_count().unwrap(), Some(7));
    }
}
