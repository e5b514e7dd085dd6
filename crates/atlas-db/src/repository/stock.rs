//! # Inventory Transfer Locker
//!
//! Atomic stock movement between two locations, with an immutable audit
//! record written in the same transaction.
//!
//! ## The Transfer Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  transfer(product P, from A, to B, quantity Q)                          │
//! │                                                                         │
//! │  1. validate        ids well-formed, A ≠ B, Q in [0.01, 999999.00],     │
//! │                     Q rounded ONCE to hundredths                        │
//! │  2. write lock      BEGIN IMMEDIATE with a SHORT busy timeout; a        │
//! │                     concurrent writer means fail fast → `Conflict`      │
//! │                     (retryable), never a silent double-spend            │
//! │  3. read rows       source row for (P, A); destination row for (P, B)   │
//! │                     tenant ownership checked on BOTH                    │
//! │  4. check           available = on-hand − reserved; Q > available →     │
//! │                     `InsufficientStock`, nothing mutated                │
//! │  5. mutate          source −Q, destination +Q (created at zero if the   │
//! │                     product has never been stocked at B)                │
//! │  6. audit           one immutable transfer_audits row                   │
//! │  7. commit          all of 5+6 or none of it                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conservation
//! A transfer never creates or destroys stock: the sum of a product's
//! quantity across all locations is identical before and after, whether the
//! transfer succeeds or fails.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use atlas_core::quantity::Quantity;
use atlas_core::validation::{
    validate_identifier, validate_transfer_locations, validate_transfer_quantity,
};
use atlas_core::{StockRecord, TransferAudit, TransferResult};

use crate::error::{DbError, DbResult, TransferError};
use crate::locking::WriteLock;

const STOCK_COLUMNS: &str = r#"
    id, tenant_id, product_id, location_id,
    quantity_hundredths, reserved_hundredths,
    created_at, updated_at
"#;

/// Repository for stock levels and audited transfers.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
    busy_timeout: Duration,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool, busy_timeout: Duration) -> Self {
        StockRepository { pool, busy_timeout }
    }

    /// Moves stock of one product from one location to another, atomically.
    ///
    /// ## Outcomes
    /// - `Ok(TransferResult)` - stock moved, audit written, all committed
    /// - `Validation` - malformed input, same-location transfer, quantity
    ///   out of bounds
    /// - `NotAuthorized` - a stock row involved belongs to another tenant
    /// - `StockNotFound` - the product has no row at the source location
    /// - `InsufficientStock` - requested more than available (on-hand minus
    ///   reserved); carries both numbers for the caller's error message
    /// - `Conflict` - another writer held the lock; retryable, nothing
    ///   happened
    ///
    /// On every error path the database is untouched.
    #[allow(clippy::too_many_arguments)]
    pub async fn transfer(
        &self,
        tenant_id: &str,
        product_id: &str,
        from_location_id: &str,
        to_location_id: &str,
        quantity: f64,
        reason: Option<&str>,
        actor_id: Option<&str>,
    ) -> Result<TransferResult, TransferError> {
        validate_identifier("tenant_id", tenant_id)?;
        validate_identifier("product_id", product_id)?;
        validate_transfer_locations(from_location_id, to_location_id)?;
        let quantity = validate_transfer_quantity(quantity)?;

        debug!(
            product_id = %product_id,
            from = %from_location_id,
            to = %to_location_id,
            quantity = %quantity,
            "Transfer requested"
        );

        let mut lock = WriteLock::acquire(&self.pool, self.busy_timeout).await?;

        let result = Self::transfer_locked(
            lock.conn(),
            tenant_id,
            product_id,
            from_location_id,
            to_location_id,
            quantity,
            reason,
            actor_id,
        )
        .await;

        match result {
            Ok(transfer) => {
                lock.commit().await?;
                info!(
                    audit_id = %transfer.audit_id,
                    product_id = %product_id,
                    from = %from_location_id,
                    to = %to_location_id,
                    quantity = %transfer.quantity,
                    "Transfer committed"
                );
                Ok(transfer)
            }
            Err(e) => {
                lock.rollback().await;
                Err(e)
            }
        }
    }

    /// Steps 3-6 of the algorithm, serialized by the caller's write lock.
    #[allow(clippy::too_many_arguments)]
    async fn transfer_locked(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        product_id: &str,
        from_location_id: &str,
        to_location_id: &str,
        quantity: Quantity,
        reason: Option<&str>,
        actor_id: Option<&str>,
    ) -> Result<TransferResult, TransferError> {
        let source = Self::find_record(conn, product_id, from_location_id)
            .await?
            .ok_or_else(|| TransferError::StockNotFound {
                product_id: product_id.to_string(),
                location_id: from_location_id.to_string(),
            })?;
        Self::check_tenant(tenant_id, &source)?;

        let available = source.available();
        if quantity > available {
            return Err(TransferError::InsufficientStock {
                product_id: product_id.to_string(),
                location_id: from_location_id.to_string(),
                available,
                requested: quantity,
            });
        }

        let destination = Self::find_record(conn, product_id, to_location_id).await?;
        if let Some(ref dest) = destination {
            Self::check_tenant(tenant_id, dest)?;
        }

        let now = Utc::now();

        // checked_sub cannot underflow here (quantity <= available <= on-hand)
        // and checked_add on the destination only overflows past i64 hundredths.
        let from_after = source
            .quantity
            .checked_sub(quantity)
            .ok_or_else(|| DbError::Internal("stock subtraction underflow".to_string()))?;

        sqlx::query(
            r#"
            UPDATE stock_records
            SET quantity_hundredths = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(from_after)
        .bind(now)
        .bind(&source.id)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        let to_after = match destination {
            Some(dest) => {
                let to_after = dest
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| DbError::Internal("stock addition overflow".to_string()))?;
                sqlx::query(
                    r#"
                    UPDATE stock_records
                    SET quantity_hundredths = ?1, updated_at = ?2
                    WHERE id = ?3
                    "#,
                )
                .bind(to_after)
                .bind(now)
                .bind(&dest.id)
                .execute(&mut *conn)
                .await
                .map_err(DbError::from)?;
                to_after
            }
            None => {
                // First time this product is stocked at the destination.
                sqlx::query(
                    r#"
                    INSERT INTO stock_records (
                        id, tenant_id, product_id, location_id,
                        quantity_hundredths, reserved_hundredths,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(tenant_id)
                .bind(product_id)
                .bind(to_location_id)
                .bind(quantity)
                .bind(now)
                .execute(&mut *conn)
                .await
                .map_err(DbError::from)?;
                quantity
            }
        };

        let audit = TransferAudit {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            product_id: product_id.to_string(),
            from_location_id: from_location_id.to_string(),
            to_location_id: to_location_id.to_string(),
            quantity,
            reason: reason.map(str::to_string),
            actor_id: actor_id.map(str::to_string),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO transfer_audits (
                id, tenant_id, product_id, from_location_id, to_location_id,
                quantity_hundredths, reason, actor_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&audit.id)
        .bind(&audit.tenant_id)
        .bind(&audit.product_id)
        .bind(&audit.from_location_id)
        .bind(&audit.to_location_id)
        .bind(audit.quantity)
        .bind(&audit.reason)
        .bind(&audit.actor_id)
        .bind(audit.created_at)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        Ok(TransferResult {
            audit_id: audit.id,
            product_id: product_id.to_string(),
            from_location_id: from_location_id.to_string(),
            to_location_id: to_location_id.to_string(),
            quantity,
            from_quantity_after: from_after,
            to_quantity_after: to_after,
        })
    }

    /// Sets the absolute stock level of a product at a location, creating
    /// the row if needed. Admin/seed tooling; NOT part of the transfer path.
    pub async fn upsert_stock(
        &self,
        tenant_id: &str,
        product_id: &str,
        location_id: &str,
        quantity: Quantity,
    ) -> Result<StockRecord, TransferError> {
        validate_identifier("tenant_id", tenant_id)?;
        validate_identifier("product_id", product_id)?;
        validate_identifier("location_id", location_id)?;

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO stock_records (
                id, tenant_id, product_id, location_id,
                quantity_hundredths, reserved_hundredths,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
            ON CONFLICT (product_id, location_id)
            DO UPDATE SET quantity_hundredths = ?5, updated_at = ?6
            "#,
        )
        .bind(&id)
        .bind(tenant_id)
        .bind(product_id)
        .bind(location_id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        let record = Self::find_record(&mut conn, product_id, location_id)
            .await?
            .ok_or_else(|| {
                TransferError::Db(DbError::Internal("upsert left no row".to_string()))
            })?;
        Ok(record)
    }

    /// Gets the stock record for a product at a location, if any.
    pub async fn get_stock(
        &self,
        product_id: &str,
        location_id: &str,
    ) -> DbResult<Option<StockRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_record(&mut conn, product_id, location_id).await
    }

    /// Total on-hand quantity of a product across all locations.
    pub async fn total_on_hand(&self, product_id: &str) -> DbResult<Quantity> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity_hundredths), 0) FROM stock_records WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(Quantity::from_hundredths(total))
    }

    /// Most recent transfer audits for a product, newest first.
    pub async fn audits_for_product(
        &self,
        product_id: &str,
        limit: i64,
    ) -> DbResult<Vec<TransferAudit>> {
        let audits = sqlx::query_as::<_, TransferAudit>(
            r#"
            SELECT id, tenant_id, product_id, from_location_id, to_location_id,
                   quantity_hundredths, reason, actor_id, created_at
            FROM transfer_audits
            WHERE product_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(audits)
    }

    async fn find_record(
        conn: &mut SqliteConnection,
        product_id: &str,
        location_id: &str,
    ) -> DbResult<Option<StockRecord>> {
        let record = sqlx::query_as::<_, StockRecord>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_records WHERE product_id = ?1 AND location_id = ?2"
        ))
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(record)
    }

    fn check_tenant(tenant_id: &str, record: &StockRecord) -> Result<(), TransferError> {
        if record.tenant_id != tenant_id {
            return Err(TransferError::NotAuthorized {
                tenant_id: tenant_id.to_string(),
                location_id: record.location_id.to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
