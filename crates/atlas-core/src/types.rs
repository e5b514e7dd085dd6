//! # Domain Types
//!
//! Row-level domain types shared across the workspace.
//!
//! ## Ownership Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Mutates What                                     │
//! │                                                                         │
//! │  Register      provisioned by admin tooling; row-locked during          │
//! │                session creation (lock_version bump)                     │
//! │                                                                         │
//! │  Session       created by the session manager; closed once; NEVER       │
//! │                deleted. Invariant: ≤ 1 open session per register        │
//! │                                                                         │
//! │  StockRecord   mutated ONLY by the transfer locker, under the write     │
//! │                lock. Invariant: quantity never goes negative            │
//! │                                                                         │
//! │  TransferAudit inserted once per successful transfer; immutable         │
//! │                                                                         │
//! │  Job           enqueue → claim → complete / requeue / fail; failed is   │
//! │                terminal once attempts reach max_attempts                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All structs derive `sqlx::FromRow` behind the `sqlx` feature so atlas-db
//! can decode them with runtime-checked queries; field names match columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quantity::Quantity;

// =============================================================================
// Register & Session
// =============================================================================

/// One physical point-of-sale terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Register {
    pub id: String,
    pub tenant_id: String,
    pub location_id: String,
    pub name: String,

    /// Bumped inside the session write lock. The bump is how the session
    /// manager pins the register row and proves it exists, so the
    /// serialization point shows up in SQL rather than hiding in a comment.
    pub lock_version: i64,

    pub created_at: DateTime<Utc>,
}

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
pub enum SessionStatus {
    Open,
    Closed,
}

/// One open/closed shift on a register.
///
/// ## Invariant
/// At most one session with status `open` exists per register at any time.
/// The session manager guarantees this under concurrency; a partial unique
/// index backstops it in the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Session {
    pub id: String,

    /// Human-readable number, format `S-<UTC compact timestamp>`.
    pub session_number: String,

    pub register_id: String,
    pub location_id: String,
    pub tenant_id: String,
    pub operator_id: String,
    pub status: SessionStatus,

    /// Cash in the drawer when the shift opened.
    pub opening_cash_cents: i64,
    /// Cash counted when the shift closed.
    pub closing_cash_cents: Option<i64>,

    // Running totals, mutated by transaction posting (outside this crate).
    pub sales_total_cents: i64,
    pub transaction_count: i64,
    pub cash_total_cents: i64,
    pub card_total_cents: i64,

    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub last_transaction_at: DateTime<Utc>,
}

// =============================================================================
// Stock & Transfers
// =============================================================================

/// Quantity of one product held at one location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockRecord {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub location_id: String,

    /// On-hand quantity. Never negative.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "quantity_hundredths"))]
    pub quantity: Quantity,

    /// Portion of the on-hand quantity held back (e.g., for open orders).
    /// Transfers may only move what is available: quantity - reserved.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "reserved_hundredths"))]
    pub reserved: Quantity,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// Quantity available to transfer: on-hand minus reserved.
    pub fn available(&self) -> Quantity {
        self.quantity
            .checked_sub(self.reserved)
            .unwrap_or(Quantity::ZERO)
    }
}

/// Immutable record of one completed transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransferAudit {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub from_location_id: String,
    pub to_location_id: String,

    /// The quantity that moved, already rounded to 2 decimal places.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "quantity_hundredths"))]
    pub quantity: Quantity,

    pub reason: Option<String>,
    pub actor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a successful transfer, returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub audit_id: String,
    pub product_id: String,
    pub from_location_id: String,
    pub to_location_id: String,

    /// The rounded quantity that actually moved.
    pub quantity: Quantity,

    pub from_quantity_after: Quantity,
    pub to_quantity_after: Quantity,
}

// =============================================================================
// Jobs
// =============================================================================

/// Job lifecycle status.
///
/// ```text
/// pending ──claim──► processing ──ok──► completed
///    ▲                    │
///    └──── requeue ◄──────┤ (attempts + 1 < max_attempts)
///                         └──exhausted──► failed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A unit of deferred work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Job {
    pub id: String,

    /// String tag resolving to a registered handler, e.g. "send-email".
    pub job_type: String,

    /// Opaque JSON payload, handed to the handler verbatim.
    pub payload: String,

    pub status: JobStatus,

    /// Number of completed executions (incremented when an attempt fails).
    pub attempts: i64,
    pub max_attempts: i64,

    /// Lower value = more urgent. Ties break FIFO by created_at.
    pub priority: i64,

    /// Worker that claimed the job most recently.
    pub claimed_by: Option<String>,

    /// Error message from the most recent failed attempt.
    pub last_error: Option<String>,

    /// Earliest time the job is eligible to be claimed (backoff gate).
    pub run_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate queue counts for operational visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_saturates_at_zero() {
        let now = Utc::now();
        let record = StockRecord {
            id: "s1".to_string(),
            tenant_id: "t1".to_string(),
            product_id: "p1".to_string(),
            location_id: "l1".to_string(),
            quantity: Quantity::from_hundredths(500),
            reserved: Quantity::from_hundredths(700),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(record.available(), Quantity::ZERO);
    }

    #[test]
    fn test_status_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Open).unwrap(),
            "\"open\""
        );
        assert_eq!(
            serde_json::to_string(&JobStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
