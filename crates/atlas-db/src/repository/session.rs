//! # Register Session Manager
//!
//! Atomic "get-or-create" of the open shift on one physical register.
//!
//! ## The Race This Exists For
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two terminals start a shift on register R1 at the same moment          │
//! │                                                                         │
//! │  Terminal A ──► get_or_create_session(R1)  ┐                            │
//! │  Terminal B ──► get_or_create_session(R1)  ┘ concurrent                 │
//! │                                                                         │
//! │  WITHOUT the lock:  both query (no open session) → both insert          │
//! │                     → two open shifts, drawer totals split across       │
//! │                     them, end-of-day reconciliation is garbage          │
//! │                                                                         │
//! │  WITH the lock:     A takes the write lock, inserts, commits            │
//! │                     B waits, finds A's session, returns it UNCHANGED    │
//! │                     (B's opening-cash argument is discarded)            │
//! │                                                                         │
//! │  Result: exactly one open session, both callers hold the same id       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two Strategies
//!
//! - [`SessionStrategy::Atomic`] (default): the whole check-then-insert runs
//!   inside an immediate transaction. Callers for the same register
//!   serialize; the register row is pinned by a `lock_version` bump.
//! - [`SessionStrategy::OptimisticRetry`] (fallback for stores where the
//!   write-lock path is not deployed): query, then insert, and treat a
//!   unique violation from the partial index as "another caller won" —
//!   re-query and return the winner's session. Explicitly weaker: it turns
//!   a duplicate-key error into success instead of preventing it.
//!
//! Either way the operation is idempotent and safe to call repeatedly and
//! concurrently for the same register.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use atlas_core::validation::{validate_identifier, validate_opening_cash_cents};
use atlas_core::{Session, SessionStatus};

use crate::error::{DbError, SessionError};
use crate::locking::WriteLock;

/// Which get-or-create algorithm the session manager runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStrategy {
    /// Check-then-insert inside one immediate transaction. The primary path.
    Atomic,

    /// Check, insert, and recover from a lost race via the unique index.
    /// Weaker fallback; see module docs.
    OptimisticRetry,
}

const SESSION_COLUMNS: &str = r#"
    id, session_number, register_id, location_id, tenant_id, operator_id,
    status, opening_cash_cents, closing_cash_cents,
    sales_total_cents, transaction_count, cash_total_cents, card_total_cents,
    opened_at, closed_at, last_transaction_at
"#;

/// Repository guaranteeing at most one open session per register.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
    strategy: SessionStrategy,
    busy_timeout: Duration,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool, strategy: SessionStrategy, busy_timeout: Duration) -> Self {
        SessionRepository {
            pool,
            strategy,
            busy_timeout,
        }
    }

    /// Returns the open session for a register, creating one if none exists.
    ///
    /// ## Contract
    /// Safe to call repeatedly and concurrently for the same register. Every
    /// concurrent caller receives the SAME session; a caller that loses the
    /// race gets the winner's session and its own `opening_cash_cents`
    /// argument is discarded. Callers for different registers only contend
    /// for the brief write-lock window.
    ///
    /// ## Errors
    /// - `Validation` for missing/malformed identifiers or negative cash
    /// - `RegisterNotFound` if the register was never provisioned
    /// - `Db` for storage failures (no partial state is left behind)
    pub async fn get_or_create_session(
        &self,
        register_id: &str,
        location_id: &str,
        tenant_id: &str,
        operator_id: &str,
        opening_cash_cents: i64,
    ) -> Result<Session, SessionError> {
        validate_identifier("register_id", register_id)?;
        validate_identifier("location_id", location_id)?;
        validate_identifier("tenant_id", tenant_id)?;
        validate_identifier("operator_id", operator_id)?;
        validate_opening_cash_cents(opening_cash_cents)?;

        match self.strategy {
            SessionStrategy::Atomic => {
                self.get_or_create_atomic(
                    register_id,
                    location_id,
                    tenant_id,
                    operator_id,
                    opening_cash_cents,
                )
                .await
            }
            SessionStrategy::OptimisticRetry => {
                self.get_or_create_optimistic(
                    register_id,
                    location_id,
                    tenant_id,
                    operator_id,
                    opening_cash_cents,
                )
                .await
            }
        }
    }

    /// Gets the open session for a register, if any.
    pub async fn get_open_session(&self, register_id: &str) -> Result<Option<Session>, SessionError> {
        validate_identifier("register_id", register_id)?;

        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        let session = Self::find_open(&mut conn, register_id).await?;
        Ok(session)
    }

    /// Closes an open session, recording the counted drawer cash.
    ///
    /// ## Errors
    /// `SessionNotFound` if the session does not exist or is already closed
    /// (the open→closed transition happens at most once).
    pub async fn close_session(
        &self,
        session_id: &str,
        closing_cash_cents: i64,
    ) -> Result<(), SessionError> {
        validate_identifier("session_id", session_id)?;
        validate_opening_cash_cents(closing_cash_cents)?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                status = 'closed',
                closing_cash_cents = ?2,
                closed_at = ?3
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(session_id)
        .bind(closing_cash_cents)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(SessionError::SessionNotFound(session_id.to_string()));
        }

        info!(session_id = %session_id, "Session closed");
        Ok(())
    }

    // =========================================================================
    // Atomic strategy
    // =========================================================================

    async fn get_or_create_atomic(
        &self,
        register_id: &str,
        location_id: &str,
        tenant_id: &str,
        operator_id: &str,
        opening_cash_cents: i64,
    ) -> Result<Session, SessionError> {
        let mut lock = WriteLock::acquire(&self.pool, self.busy_timeout).await?;

        let result = Self::get_or_create_locked(
            lock.conn(),
            register_id,
            location_id,
            tenant_id,
            operator_id,
            opening_cash_cents,
        )
        .await;

        match result {
            Ok(session) => {
                lock.commit().await?;
                Ok(session)
            }
            Err(e) => {
                lock.rollback().await;
                Err(e)
            }
        }
    }

    /// Steps 2-4 of the algorithm, serialized by the caller's write lock.
    async fn get_or_create_locked(
        conn: &mut SqliteConnection,
        register_id: &str,
        location_id: &str,
        tenant_id: &str,
        operator_id: &str,
        opening_cash_cents: i64,
    ) -> Result<Session, SessionError> {
        // Pin the register row. The bump doubles as the existence check and
        // puts the serialization point in SQL where it can be audited.
        let bumped = sqlx::query("UPDATE registers SET lock_version = lock_version + 1 WHERE id = ?1")
            .bind(register_id)
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)?;

        if bumped.rows_affected() == 0 {
            return Err(SessionError::RegisterNotFound(register_id.to_string()));
        }

        if let Some(existing) = Self::find_open(conn, register_id).await? {
            debug!(
                register_id = %register_id,
                session_id = %existing.id,
                "Open session already exists, returning it"
            );
            return Ok(existing);
        }

        let session = Self::new_session(
            register_id,
            location_id,
            tenant_id,
            operator_id,
            opening_cash_cents,
        );
        Self::insert(conn, &session).await?;

        info!(
            register_id = %register_id,
            session_id = %session.id,
            session_number = %session.session_number,
            "Session opened"
        );
        Ok(session)
    }

    // =========================================================================
    // Optimistic fallback strategy
    // =========================================================================

    async fn get_or_create_optimistic(
        &self,
        register_id: &str,
        location_id: &str,
        tenant_id: &str,
        operator_id: &str,
        opening_cash_cents: i64,
    ) -> Result<Session, SessionError> {
        // Two rounds: a lost insert race re-queries and should find the
        // winner; if the winner closed its session in between, the second
        // round's insert wins instead.
        for round in 0..2 {
            let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
            if let Some(existing) = Self::find_open(&mut conn, register_id).await? {
                return Ok(existing);
            }
            drop(conn);

            let session = Self::new_session(
                register_id,
                location_id,
                tenant_id,
                operator_id,
                opening_cash_cents,
            );

            let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
            match Self::insert(&mut conn, &session).await {
                Ok(()) => {
                    info!(
                        register_id = %register_id,
                        session_id = %session.id,
                        "Session opened (optimistic path)"
                    );
                    return Ok(session);
                }
                Err(DbError::UniqueViolation { .. }) => {
                    // Race condition detected: another caller inserted the
                    // open session between our query and our insert. The
                    // violation is a success signal here, not an error.
                    warn!(
                        register_id = %register_id,
                        round = round,
                        "Lost session-creation race, returning winner's session"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Both rounds lost the race and the winner vanished in between each
        // time. Concurrency this pathological means something else is wrong.
        Err(SessionError::Db(DbError::Internal(format!(
            "could not settle session-creation race for register {}",
            register_id
        ))))
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    async fn find_open(
        conn: &mut SqliteConnection,
        register_id: &str,
    ) -> Result<Option<Session>, SessionError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE register_id = ?1 AND status = 'open' LIMIT 1"
        ))
        .bind(register_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DbError::from)?;

        Ok(session)
    }

    fn new_session(
        register_id: &str,
        location_id: &str,
        tenant_id: &str,
        operator_id: &str,
        opening_cash_cents: i64,
    ) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            session_number: generate_session_number(),
            register_id: register_id.to_string(),
            location_id: location_id.to_string(),
            tenant_id: tenant_id.to_string(),
            operator_id: operator_id.to_string(),
            status: SessionStatus::Open,
            opening_cash_cents,
            closing_cash_cents: None,
            sales_total_cents: 0,
            transaction_count: 0,
            cash_total_cents: 0,
            card_total_cents: 0,
            opened_at: now,
            closed_at: None,
            last_transaction_at: now,
        }
    }

    async fn insert(conn: &mut SqliteConnection, session: &Session) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, session_number, register_id, location_id, tenant_id, operator_id,
                status, opening_cash_cents, closing_cash_cents,
                sales_total_cents, transaction_count, cash_total_cents, card_total_cents,
                opened_at, closed_at, last_transaction_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12, ?13,
                ?14, ?15, ?16
            )
            "#,
        )
        .bind(&session.id)
        .bind(&session.session_number)
        .bind(&session.register_id)
        .bind(&session.location_id)
        .bind(&session.tenant_id)
        .bind(&session.operator_id)
        .bind(session.status)
        .bind(session.opening_cash_cents)
        .bind(session.closing_cash_cents)
        .bind(session.sales_total_cents)
        .bind(session.transaction_count)
        .bind(session.cash_total_cents)
        .bind(session.card_total_cents)
        .bind(session.opened_at)
        .bind(session.closed_at)
        .bind(session.last_transaction_at)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        Ok(())
    }
}

/// Generates a session number: `S-<UTC compact timestamp>`.
///
/// ## Example
/// `S-20260823141530123`
fn generate_session_number() -> String {
    format!("S-{}", Utc::now().format("%Y%m%d%H%M%S%3f"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use std::path::PathBuf;

    async fn db_with_register() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let register = db
            .registers()
            .create("tenant-1", "loc-1", "Front")
            .await
            .unwrap();
        (db, register.id)
    }

    fn temp_db_path() -> PathBuf {
        std::env::temp_dir().join(format!("atlas-session-test-{}.sqlite", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_creates_session_when_none_open() {
        let (db, register_id) = db_with_register().await;

        let session = db
            .sessions()
            .get_or_create_session(&register_id, "loc-1", "tenant-1", "op-1", 10_000)
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Open);
        assert_eq!(session.opening_cash_cents, 10_000);
        assert_eq!(session.sales_total_cents, 0);
        assert_eq!(session.transaction_count, 0);
        assert!(session.session_number.starts_with("S-"));
        assert_eq!(session.opened_at, session.last_transaction_at);
    }

    #[tokio::test]
    async fn test_idempotent_returns_same_session() {
        let (db, register_id) = db_with_register().await;

        let first = db
            .sessions()
            .get_or_create_session(&register_id, "loc-1", "tenant-1", "op-1", 10_000)
            .await
            .unwrap();

        // Second caller with DIFFERENT opening cash gets the winner's
        // session; its argument is discarded, never applied.
        let second = db
            .sessions()
            .get_or_create_session(&register_id, "loc-1", "tenant-1", "op-2", 99_999)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.opening_cash_cents, 10_000);
    }

    #[tokio::test]
    async fn test_concurrent_callers_get_one_session() {
        // File-backed pool so callers contend over real connections.
        let path = temp_db_path();
        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let register_id = db
            .registers()
            .create("tenant-1", "loc-1", "Front")
            .await
            .unwrap()
            .id;

        let mut handles = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            let register_id = register_id.clone();
            handles.push(tokio::spawn(async move {
                db.sessions()
                    .get_or_create_session(
                        &register_id,
                        "loc-1",
                        "tenant-1",
                        "op-1",
                        1_000 * i as i64,
                    )
                    .await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            let session = handle.await.unwrap().unwrap();
            ids.push(session.id);
        }

        // Every caller observed the same session...
        ids.dedup();
        assert_eq!(ids.len(), 1);

        // ...and exactly one open row exists.
        let open_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE register_id = ?1 AND status = 'open'",
        )
        .bind(&register_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(open_count, 1);

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_unknown_register_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db
            .sessions()
            .get_or_create_session("no-such-register", "loc-1", "tenant-1", "op-1", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::RegisterNotFound(_)));
    }

    #[tokio::test]
    async fn test_validation_rejects_missing_ids() {
        let (db, register_id) = db_with_register().await;
        let sessions = db.sessions();

        let err = sessions
            .get_or_create_session("", "loc-1", "tenant-1", "op-1", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));

        let err = sessions
            .get_or_create_session(&register_id, "loc-1", "tenant-1", "op-1", -5)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_close_then_reopen_creates_new_session() {
        let (db, register_id) = db_with_register().await;
        let sessions = db.sessions();

        let first = sessions
            .get_or_create_session(&register_id, "loc-1", "tenant-1", "op-1", 5_000)
            .await
            .unwrap();

        sessions.close_session(&first.id, 7_500).await.unwrap();
        assert!(sessions
            .get_open_session(&register_id)
            .await
            .unwrap()
            .is_none());

        // Closing twice is not a valid transition.
        let err = sessions.close_session(&first.id, 7_500).await.unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound(_)));

        let second = sessions
            .get_or_create_session(&register_id, "loc-1", "tenant-1", "op-1", 5_000)
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_optimistic_strategy_returns_existing_session() {
        let path = temp_db_path();
        let db = Database::new(
            DbConfig::new(&path).session_strategy(SessionStrategy::OptimisticRetry),
        )
        .await
        .unwrap();
        let register_id = db
            .registers()
            .create("tenant-1", "loc-1", "Front")
            .await
            .unwrap()
            .id;
        let sessions = db.sessions();

        let first = sessions
            .get_or_create_session(&register_id, "loc-1", "tenant-1", "op-1", 1_000)
            .await
            .unwrap();
        let second = sessions
            .get_or_create_session(&register_id, "loc-1", "tenant-1", "op-2", 2_000)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.opening_cash_cents, 1_000);

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_optimistic_strategy_recovers_from_lost_race() {
        // Simulate losing the race: the winner's open session appears AFTER
        // the fallback's initial query would have missed it. The unique
        // index fires on insert and the fallback must return the winner's
        // row instead of surfacing an error.
        let path = temp_db_path();
        let db = Database::new(
            DbConfig::new(&path).session_strategy(SessionStrategy::OptimisticRetry),
        )
        .await
        .unwrap();
        let register_id = db
            .registers()
            .create("tenant-1", "loc-1", "Front")
            .await
            .unwrap()
            .id;
        let sessions = db.sessions();

        // Winner's session, inserted directly (as if by another process).
        let winner = sessions
            .get_or_create_session(&register_id, "loc-1", "tenant-1", "op-winner", 42)
            .await
            .unwrap();

        // The partial unique index rejects a second open insert outright.
        let mut conn = db.pool().acquire().await.unwrap();
        let loser = SessionRepository::new_session(&register_id, "loc-1", "tenant-1", "op-loser", 0);
        let err = SessionRepository::insert(&mut conn, &loser).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        drop(conn);

        // And the public operation keeps returning the winner.
        let settled = sessions
            .get_or_create_session(&register_id, "loc-1", "tenant-1", "op-loser", 0)
            .await
            .unwrap();
        assert_eq!(settled.id, winner.id);

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_session_number_format() {
        let number = generate_session_number();
        assert!(number.starts_with("S-"));
        // S- plus YYYYMMDDHHMMSSmmm
        assert_eq!(number.len(), 2 + 17);
        assert!(number[2..].chars().all(|c| c.is_ascii_digit()));
    }
}
