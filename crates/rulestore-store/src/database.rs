use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::schema;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Thread-safe SQLite connection wrapper.
/// Uses parking_lot::Mutex for synchronous access (rusqlite is not Sync).
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::Connection(format!("{}: {e}", path.display())))?;

        conn.busy_timeout(busy_timeout)
            .map_err(StoreError::schema("busy timeout"))?;
        conn.execute_batch(schema::PRAGMAS)
            .map_err(StoreError::schema("pragmas"))?;
        // journal_mode reports the resulting mode as a row
        let mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(StoreError::schema("journal mode"))?;

        info!(path = %path.display(), journal_mode = %mode, "database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_owned(),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.execute_batch(schema::PRAGMAS)
            .map_err(StoreError::schema("pragmas"))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        })
    }

    /// Execute a closure with the database connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Round-trip a trivial query to prove the connection is usable.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(|e| StoreError::Connection(format!("ping: {e}")))
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release this handle. The connection itself is closed, and any close
    /// error surfaced, only when this is the last handle to it.
    pub fn close(self) -> Result<(), StoreError> {
        let path = self.path;
        match Arc::try_unwrap(self.conn) {
            Ok(conn) => conn.into_inner().close().map_err(|(_, e)| {
                warn!(path = %path.display(), error = %e, "close failed");
                StoreError::Connection(format!("close: {e}"))
            }),
            Err(_) => Ok(()),
        }
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.path(), Path::new(":memory:"));
        db.ping().unwrap();
    }

    #[test]
    fn foreign_keys_enabled() {
        let db = Database::in_memory().unwrap();
        let on: i64 = db
            .with_conn(|conn| {
                conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                    .map_err(StoreError::statement("pragma"))
            })
            .unwrap();
        assert_eq!(on, 1);
    }

    #[test]
    fn open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rules.db");
        let db = Database::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
        assert!(path.exists());

        // reopening an existing file must succeed
        let db2 = Database::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
        db.close().unwrap();
        db2.close().unwrap();
    }

    #[test]
    fn wal_mode_enabled_for_files() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("wal.db"), DEFAULT_BUSY_TIMEOUT).unwrap();
        let mode: String = db
            .with_conn(|conn| {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
                    .map_err(StoreError::statement("pragma"))
            })
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn close_with_live_clone_keeps_connection() {
        let db = Database::in_memory().unwrap();
        let other = db.clone();
        db.close().unwrap();
        other.ping().unwrap();
    }
}
