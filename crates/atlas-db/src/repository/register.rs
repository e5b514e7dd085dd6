//! # Register Repository
//!
//! Provisioning and lookup for physical POS terminals. Registers are created
//! by admin tooling (and the seed binary); the session manager only ever
//! bumps `lock_version` inside its write lock.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use atlas_core::validation::validate_identifier;
use atlas_core::Register;

use crate::error::{DbResult, SessionError};

/// Repository for register provisioning.
#[derive(Debug, Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    /// Creates a new RegisterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RegisterRepository { pool }
    }

    /// Provisions a new register.
    pub async fn create(
        &self,
        tenant_id: &str,
        location_id: &str,
        name: &str,
    ) -> Result<Register, SessionError> {
        validate_identifier("tenant_id", tenant_id)?;
        validate_identifier("location_id", location_id)?;

        let register = Register {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            location_id: location_id.to_string(),
            name: name.to_string(),
            lock_version: 0,
            created_at: Utc::now(),
        };

        debug!(id = %register.id, location_id = %location_id, "Creating register");

        sqlx::query(
            r#"
            INSERT INTO registers (id, tenant_id, location_id, name, lock_version, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&register.id)
        .bind(&register.tenant_id)
        .bind(&register.location_id)
        .bind(&register.name)
        .bind(register.lock_version)
        .bind(register.created_at)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::from)?;

        Ok(register)
    }

    /// Gets a register by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Register>> {
        let register = sqlx::query_as::<_, Register>(
            r#"
            SELECT id, tenant_id, location_id, name, lock_version, created_at
            FROM registers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(register)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let register = db
            .registers()
            .create("tenant-1", "loc-1", "Front Counter")
            .await
            .unwrap();

        let fetched = db
            .registers()
            .get_by_id(&register.id)
            .await
            .unwrap()
            .expect("register should exist");
        assert_eq!(fetched.location_id, "loc-1");
        assert_eq!(fetched.lock_version, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db.registers().create("", "loc-1", "X").await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
    }
}
