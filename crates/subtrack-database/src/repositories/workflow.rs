//! Reminder workflow repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use subtrack_core::error::{AppError, ErrorKind};
use subtrack_core::result::AppResult;
use subtrack_core::types::id::SubscriptionId;
use subtrack_entity::workflow::ReminderWorkflow;

use crate::store::WorkflowStore;

/// PostgreSQL workflow store with optimistic versioning.
#[derive(Debug, Clone)]
pub struct WorkflowRepository {
    pool: PgPool,
}

impl WorkflowRepository {
    /// Create a new workflow repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStore for WorkflowRepository {
    async fn get(&self, subscription_id: SubscriptionId) -> AppResult<Option<ReminderWorkflow>> {
        sqlx::query_as::<_, ReminderWorkflow>(
            "SELECT * FROM reminder_workflows WHERE subscription_id = $1",
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load workflow", e))
    }

    async fn compare_and_set(
        &self,
        next: ReminderWorkflow,
        expected_version: i64,
    ) -> AppResult<ReminderWorkflow> {
        let stored = if expected_version == 0 {
            sqlx::query_as::<_, ReminderWorkflow>(
                "INSERT INTO reminder_workflows \
                 (subscription_id, handle, next_fire_at, last_evaluated_at, version, updated_at) \
                 VALUES ($1, $2, $3, $4, 1, $5) \
                 ON CONFLICT (subscription_id) DO NOTHING RETURNING *",
            )
            .bind(next.subscription_id)
            .bind(&next.handle)
            .bind(next.next_fire_at)
            .bind(next.last_evaluated_at)
            .bind(next.updated_at)
            .fetch_optional(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, ReminderWorkflow>(
                "UPDATE reminder_workflows SET handle = $2, next_fire_at = $3, \
                 last_evaluated_at = $4, version = version + 1, updated_at = $5 \
                 WHERE subscription_id = $1 AND version = $6 RETURNING *",
            )
            .bind(next.subscription_id)
            .bind(&next.handle)
            .bind(next.next_fire_at)
            .bind(next.last_evaluated_at)
            .bind(next.updated_at)
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await
        }
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to store workflow", e))?;

        stored.ok_or_else(|| {
            AppError::conflict(format!(
                "Workflow for subscription {} was modified concurrently",
                next.subscription_id
            ))
        })
    }
}
