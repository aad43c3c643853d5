//! PostgreSQL implementation of the deactivation snapshot store.
//!
//! The whole snapshot map for a reader lives in one JSONB row; the write
//! replaces it (last writer wins, per the accepted concurrency model).

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::UserId;
use crate::domain::membership::DeactivationSnapshot;
use crate::ports::{SnapshotStore, SnapshotStoreError};

/// PostgreSQL implementation of the `SnapshotStore` port.
pub struct PostgresSnapshotStore {
    pool: PgPool,
}

impl PostgresSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    snapshot: serde_json::Value,
}

#[async_trait]
impl SnapshotStore for PostgresSnapshotStore {
    async fn load(&self, user_id: UserId) -> Result<DeactivationSnapshot, SnapshotStoreError> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            "SELECT snapshot FROM deactivation_snapshots WHERE user_id = $1",
        )
        .bind(user_id.as_u64() as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SnapshotStoreError::new(e.to_string()))?;

        match row {
            Some(row) => serde_json::from_value(row.snapshot)
                .map_err(|e| SnapshotStoreError::new(format!("Invalid snapshot JSON: {}", e))),
            None => Ok(DeactivationSnapshot::new()),
        }
    }

    async fn store(
        &self,
        user_id: UserId,
        snapshot: &DeactivationSnapshot,
    ) -> Result<(), SnapshotStoreError> {
        let value = serde_json::to_value(snapshot)
            .map_err(|e| SnapshotStoreError::new(e.to_string()))?;
        sqlx::query(
            "INSERT INTO deactivation_snapshots (user_id, snapshot, updated_at)
             VALUES ($1, $2, now())
             ON CONFLICT (user_id) DO UPDATE SET snapshot = $2, updated_at = now()",
        )
        .bind(user_id.as_u64() as i64)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| SnapshotStoreError::new(e.to_string()))?;
        Ok(())
    }
}
