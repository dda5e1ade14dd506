//! SQLite pool
//!
//! One r2d2 pool per process. File databases run in WAL mode so a calculation
//! can read a stable snapshot while another tool call writes.

use std::path::Path;
use std::sync::Arc;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use thiserror::Error;

/// Storage failures
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database pool error: {0}")]
    Connection(#[from] r2d2::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Settings applied to every pooled file connection
const FILE_PRAGMAS: &str = "PRAGMA foreign_keys = ON;
                            PRAGMA journal_mode = WAL;
                            PRAGMA synchronous = NORMAL;
                            PRAGMA busy_timeout = 5000;
                            PRAGMA temp_store = MEMORY;";

/// Cloneable handle to the ingredient/recipe store
#[derive(Clone)]
pub struct Database {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl Database {
    /// Open (or create) the database file behind a pool of up to ten connections
    pub fn new<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)
            .with_init(|conn| conn.execute_batch(FILE_PRAGMAS));

        Self::from_manager(manager, 10)
    }

    /// A private in-memory database for tests.
    ///
    /// Each in-memory connection is a separate database, so the pool holds one.
    pub fn in_memory() -> DbResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

        Self::from_manager(manager, 1)
    }

    fn from_manager(manager: SqliteConnectionManager, max_size: u32) -> DbResult<Self> {
        let pool = Pool::builder().max_size(max_size).build(manager)?;
        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn get_conn(&self) -> DbResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Run `f` on a pooled connection in autocommit mode
    pub fn with_conn<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let conn = self.get_conn()?;
        f(&conn)
    }

    /// Run `f` with mutable access, for callers that manage their own transaction
    pub fn with_conn_mut<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut Connection) -> DbResult<T>,
    {
        let mut conn = self.get_conn()?;
        f(&mut conn)
    }

    /// Run `f` inside one deferred read transaction.
    ///
    /// Every SELECT issued by `f` sees the same committed state; writes from
    /// other connections land either entirely before or entirely after.
    pub fn with_snapshot<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_runs_in_transaction() {
        let db = Database::in_memory().unwrap();
        assert!(db.with_conn(|conn| Ok(conn.is_autocommit())).unwrap());
        assert!(!db.with_snapshot(|conn| Ok(conn.is_autocommit())).unwrap());
        // the connection goes back to the pool out of the transaction
        assert!(db.with_conn(|conn| Ok(conn.is_autocommit())).unwrap());
    }

    #[test]
    fn test_snapshot_error_rolls_back() {
        let db = Database::in_memory().unwrap();
        let result: DbResult<()> = db.with_snapshot(|conn| {
            conn.execute_batch("SELECT * FROM missing_table")?;
            Ok(())
        });
        assert!(result.is_err());
        assert!(db.with_conn(|conn| Ok(conn.is_autocommit())).unwrap());
    }

    #[test]
    fn test_snapshot_isolated_from_concurrent_write() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("snap.db")).unwrap();
        db.with_conn(|conn| conn.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (1);").map_err(DbError::from))
            .unwrap();

        let writer = db.clone();
        let (first, second) = db
            .with_snapshot(|conn| {
                let first: i64 = conn.query_row("SELECT SUM(v) FROM t", [], |r| r.get(0))?;
                writer.with_conn(|w| {
                    w.execute("INSERT INTO t VALUES (10)", [])?;
                    Ok(())
                })?;
                let second: i64 = conn.query_row("SELECT SUM(v) FROM t", [], |r| r.get(0))?;
                Ok((first, second))
            })
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 1);
        let after: i64 = db.with_conn(|conn| Ok(conn.query_row("SELECT SUM(v) FROM t", [], |r| r.get(0))?)).unwrap();
        assert_eq!(after, 11);
    }
}
