//! # Database Error Types
//!
//! Storage errors plus the caller-facing taxonomies for the session manager
//! and the transfer locker.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← categorizes: busy / unique / fk / internal     │
//! │       │                                                                 │
//! │       ├──► SessionError   (register not found, validation, internal)    │
//! │       │                                                                 │
//! │       └──► TransferError  (conflict, insufficient stock, not found,     │
//! │                            not authorized, validation, internal)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HTTP layer (external) maps the taxonomy to status codes                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two DbError variants carry special meaning for the concurrency design:
//! - `Busy`: another writer holds the database — the transfer locker turns
//!   this into the retryable `conflict` outcome
//! - `UniqueViolation`: the partial unique index fired — the optimistic
//!   session fallback turns this into "return the winner's session"

use thiserror::Error;

use atlas_core::error::ValidationError;
use atlas_core::quantity::Quantity;

// =============================================================================
// Storage Errors
// =============================================================================

/// Database operation errors.
///
/// These wrap sqlx errors and add the categorization the concurrency paths
/// depend on (busy vs. unique violation vs. everything else).
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Second open session inserted for one register (partial index)
    /// - Duplicate (product, location) stock record
    #[error("Duplicate {field}: already exists")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Another writer holds the database write lock and the busy timeout
    /// elapsed. Retryable.
    #[error("Database is busy: another writer holds the lock")]
    Busy,

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound              → DbError::NotFound
/// sqlx::Error::Database "locked"        → DbError::Busy
/// sqlx::Error::Database "UNIQUE ..."    → DbError::UniqueViolation
/// sqlx::Error::Database "FOREIGN KEY"   → DbError::ForeignKeyViolation
/// sqlx::Error::PoolTimedOut             → DbError::PoolExhausted
/// Other                                 → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint/busy messages:
                //   SQLITE_BUSY:  "database is locked"
                //   UNIQUE:       "UNIQUE constraint failed: <table>.<column>"
                //   FK:           "FOREIGN KEY constraint failed"
                if msg.contains("database is locked") || msg.contains("database table is locked") {
                    DbError::Busy
                } else if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { field }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Session Manager Taxonomy
// =============================================================================

/// Caller-facing errors from the register session manager.
///
/// The expected race (another terminal won the lock or the insert) is NOT in
/// this enum: the manager recovers from it internally by returning the
/// winner's session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad or missing input. Never retried; maps to a 4xx.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The register does not exist.
    #[error("Register not found: {0}")]
    RegisterNotFound(String),

    /// No open session with the given ID (close of an already-closed shift).
    #[error("Open session not found: {0}")]
    SessionNotFound(String),

    /// Unexpected storage failure. No partial state was left behind.
    #[error(transparent)]
    Db(#[from] DbError),
}

// =============================================================================
// Transfer Locker Taxonomy
// =============================================================================

/// Caller-facing errors from the inventory transfer locker.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Bad or missing input. Never retried.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The location's stock is not owned by the calling tenant.
    #[error("Location {location_id} is not owned by tenant {tenant_id}")]
    NotAuthorized {
        tenant_id: String,
        location_id: String,
    },

    /// Another transfer holds the lock. Safe to retry immediately.
    #[error("Transfer in progress, try again")]
    Conflict,

    /// Business rule: the source cannot cover the requested quantity.
    #[error(
        "Insufficient stock for {product_id} at {location_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        location_id: String,
        available: Quantity,
        requested: Quantity,
    },

    /// No stock record for the product at one of the locations.
    #[error("Stock record not found for {product_id} at {location_id}")]
    StockNotFound {
        product_id: String,
        location_id: String,
    },

    /// Unexpected storage failure. The transaction rolled back.
    #[error(transparent)]
    Db(DbError),
}

impl TransferError {
    /// Whether the caller should surface a "try again" hint.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::Conflict)
    }
}

impl From<DbError> for TransferError {
    fn from(err: DbError) -> Self {
        match err {
            // Lock contention is the retryable conflict outcome, not an
            // internal failure.
            DbError::Busy => TransferError::Conflict,
            other => TransferError::Db(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_maps_to_conflict() {
        let err: TransferError = DbError::Busy.into();
        assert!(matches!(err, TransferError::Conflict));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_db_errors_are_not_retryable() {
        let err: TransferError = DbError::Internal("boom".to_string()).into();
        assert!(!err.is_retryable());
        assert!(matches!(err, TransferError::Db(_)));
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = TransferError::InsufficientStock {
            product_id: "prod-1".to_string(),
            location_id: "loc-a".to_string(),
            available: Quantity::from_hundredths(300),
            requested: Quantity::from_hundredths(1000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for prod-1 at loc-a: available 3.00, requested 10.00"
        );
    }
}
