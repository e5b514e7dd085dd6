//! # Write-Lock Discipline
//!
//! SQLite has no `SELECT ... FOR UPDATE`; its exclusive-writer primitive is
//! an immediate-mode transaction. This module wraps that primitive so the
//! locking discipline is visible at every call site instead of hiding inside
//! a query builder.
//!
//! ## How One Critical Section Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WriteLock::acquire(pool, busy_timeout)                                 │
//! │       │                                                                 │
//! │       ├── PRAGMA busy_timeout = <ms>   ← how long to wait for the       │
//! │       │                                  current writer to finish       │
//! │       │                                                                 │
//! │       ├── BEGIN IMMEDIATE              ← takes the writer slot NOW,     │
//! │       │        │                         not lazily at first write      │
//! │       │        └── SQLITE_BUSY ──► DbError::Busy (retryable)            │
//! │       ▼                                                                 │
//! │  caller runs queries on lock.conn()  ← serialized vs. all writers       │
//! │       │                                                                 │
//! │       ├── success ──► lock.commit()                                     │
//! │       └── failure ──► lock.rollback()  (no partial state observable)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Busy-Timeout Policy
//! - Session creation waits a few seconds: terminal start-up races are short
//!   and the loser should observe the winner's session, not an error.
//! - Transfers use a near-zero timeout: a blocked transfer fails fast into
//!   the retryable `conflict` outcome instead of queuing a request thread.
//!
//! ## Invariant
//! Every `acquire` is followed by exactly one `commit` or `rollback`; the
//! repository methods enforce this by shape (body runs in a helper, the
//! wrapper matches on its result).

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// An acquired exclusive-writer transaction.
pub(crate) struct WriteLock {
    conn: PoolConnection<Sqlite>,
}

impl WriteLock {
    /// Acquires the database write lock with the given busy timeout.
    ///
    /// ## Errors
    /// `DbError::Busy` if another writer held the lock for longer than
    /// `busy_timeout`; pool/connection errors otherwise.
    pub(crate) async fn acquire(pool: &SqlitePool, busy_timeout: Duration) -> DbResult<Self> {
        let mut conn = pool.acquire().await.map_err(DbError::from)?;

        // PRAGMA does not support bind parameters; the value is a number we
        // control, never caller input.
        let timeout_ms = busy_timeout.as_millis().min(i32::MAX as u128);
        sqlx::query(&format!("PRAGMA busy_timeout = {}", timeout_ms))
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)?;

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)?;

        debug!(timeout_ms = %timeout_ms, "Write lock acquired");
        Ok(WriteLock { conn })
    }

    /// The connection holding the transaction.
    pub(crate) fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Commits the critical section.
    pub(crate) async fn commit(mut self) -> DbResult<()> {
        sqlx::query("COMMIT")
            .execute(&mut *self.conn)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Rolls the critical section back. Best-effort: the original error is
    /// what the caller reports, so a rollback failure is only logged.
    pub(crate) async fn rollback(mut self) {
        if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *self.conn).await {
            warn!(error = %e, "Rollback failed while unwinding a write lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_acquire_commit_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut lock = WriteLock::acquire(db.pool(), Duration::from_millis(100))
            .await
            .unwrap();
        sqlx::query("CREATE TABLE write_lock_probe (id INTEGER)")
            .execute(lock.conn())
            .await
            .unwrap();
        lock.commit().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM write_lock_probe")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        sqlx::query("CREATE TABLE rollback_probe (id INTEGER)")
            .execute(db.pool())
            .await
            .unwrap();

        let mut lock = WriteLock::acquire(db.pool(), Duration::from_millis(100))
            .await
            .unwrap();
        sqlx::query("INSERT INTO rollback_probe (id) VALUES (1)")
            .execute(lock.conn())
            .await
            .unwrap();
        lock.rollback().await;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rollback_probe")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
