//! Connection pool over `r2d2`.
//!
//! Every connection gets the same pragmas and busy timeout when it is
//! opened. Migrations run once, on the first checkout after the pool is
//! built. An in-memory pool holds exactly one connection that never
//! expires, because separate in-memory connections do not share a
//! database.

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use super::sqlite::{configure_connection, run_migrations};
use super::DatabaseError;

/// A connection checked out of [`DbPool`]. Derefs to `rusqlite::Connection`.
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

#[derive(Clone)]
pub struct DbPool {
    inner: Pool<SqliteConnectionManager>,
}

impl DbPool {
    /// Pool of up to `size` connections to the database file.
    pub fn open(path: &Path, size: usize) -> Result<Self, DatabaseError> {
        let size = u32::try_from(size.max(1)).unwrap_or(u32::MAX);
        let manager = SqliteConnectionManager::file(path).with_init(|c| configure_connection(c));
        let inner = Pool::builder().max_size(size).build(manager)?;
        run_migrations(&*inner.get()?)?;
        tracing::info!(path = %path.display(), size, "Database pool opened");
        Ok(Self { inner })
    }

    /// Single-connection pool over a fresh in-memory database.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let manager = SqliteConnectionManager::memory().with_init(|c| configure_connection(c));
        let inner = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        run_migrations(&*inner.get()?)?;
        Ok(Self { inner })
    }

    pub fn size(&self) -> u32 {
        self.inner.max_size()
    }

    /// Check out a connection, waiting up to the pool's connection timeout.
    /// Drop it before any `.await` in the caller.
    pub fn get(&self) -> Result<PooledConn, DatabaseError> {
        Ok(self.inner.get()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foreign_keys(conn: &rusqlite::Connection) -> i64 {
        conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn in_memory_pool_keeps_schema_between_checkouts() {
        let pool = DbPool::in_memory().unwrap();
        assert_eq!(pool.size(), 1);
        {
            let conn = pool.get().unwrap();
            assert_eq!(foreign_keys(&conn), 1);
            conn.execute("INSERT INTO users (id, email) VALUES ('u1', 'one@example.com')", [])
                .unwrap();
        }
        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn file_pool_connections_share_data() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = DbPool::open(&tmp.path().join("pool.db"), 3).unwrap();
        assert_eq!(pool.size(), 3);

        let first = pool.get().unwrap();
        first
            .execute("INSERT INTO users (id, email) VALUES ('u1', 'one@example.com')", [])
            .unwrap();

        // The first connection is still checked out, so this is another one.
        let second = pool.get().unwrap();
        assert_eq!(foreign_keys(&second), 1);
        let count: i64 = second
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn zero_size_is_clamped() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = DbPool::open(&tmp.path().join("pool.db"), 0).unwrap();
        assert_eq!(pool.size(), 1);
    }
}
