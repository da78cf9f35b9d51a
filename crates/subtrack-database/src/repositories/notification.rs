//! Notification repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use subtrack_core::error::{AppError, ErrorKind};
use subtrack_core::result::AppResult;
use subtrack_core::types::id::{NotificationId, UserId};
use subtrack_core::types::pagination::{PageRequest, PageResponse};
use subtrack_entity::notification::{Generated, NewNotification, Notification, NotificationFilter};

use crate::store::NotificationStore;

const FILTER_CLAUSE: &str = "user_id = $1 \
     AND ($2::boolean IS NULL OR read = $2) \
     AND ($3::notification_kind IS NULL OR kind = $3) \
     AND ($4::notification_priority IS NULL OR priority = $4)";

/// PostgreSQL notification store.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn uuids(ids: &[NotificationId]) -> Vec<Uuid> {
    ids.iter().map(|id| id.into_uuid()).collect()
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn find_or_insert(
        &self,
        new: NewNotification,
        window_start: DateTime<Utc>,
    ) -> AppResult<Generated> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        // Serializes concurrent generators with the same key until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(&new.dedup_key)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to take dedup lock", e))?;

        let existing = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE dedup_key = $1 AND created_at > $2 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(&new.dedup_key)
        .bind(window_start)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to look up notification", e))?;

        if let Some(found) = existing {
            tx.commit().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
            })?;
            return Ok(Generated::Existing(found));
        }

        let row = new.into_notification();
        let inserted = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications \
             (id, user_id, subscription_id, kind, title, message, read, read_at, priority, \
              metadata, dedup_key, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, NULL, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.subscription_id)
        .bind(row.kind)
        .bind(&row.title)
        .bind(&row.message)
        .bind(row.priority)
        .bind(Json(&row.metadata.0))
        .bind(&row.dedup_key)
        .bind(row.created_at)
        .bind(row.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert notification", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })?;

        Ok(Generated::Created(inserted))
    }

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find notification", e))
    }

    async fn list(
        &self,
        user_id: UserId,
        filter: NotificationFilter,
        page: PageRequest,
    ) -> AppResult<PageResponse<Notification>> {
        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM notifications WHERE {FILTER_CLAUSE}"))
                .bind(user_id)
                .bind(filter.read)
                .bind(filter.kind)
                .bind(filter.priority)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count notifications", e)
                })?;

        let items = sqlx::query_as::<_, Notification>(&format!(
            "SELECT * FROM notifications WHERE {FILTER_CLAUSE} \
             ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
        ))
        .bind(user_id)
        .bind(filter.read)
        .bind(filter.kind)
        .bind(filter.priority)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list notifications", e))?;

        Ok(PageResponse::new(items, page.page, page.page_size, total as u64))
    }

    async fn count_unread(&self, user_id: UserId) -> AppResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT read")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count unread", e)
                })?;
        Ok(count as u64)
    }

    async fn set_read(
        &self,
        user_id: UserId,
        id: NotificationId,
        read: bool,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET read = $3, \
             read_at = CASE WHEN $3 THEN COALESCE(read_at, $4) ELSE NULL END \
             WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(read)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update read flag", e))
    }

    async fn mark_all_read(&self, user_id: UserId, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE, read_at = $2 WHERE user_id = $1 AND NOT read",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark all read", e))?;
        Ok(result.rows_affected())
    }

    async fn mark_read_bulk(
        &self,
        user_id: UserId,
        ids: &[NotificationId],
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE, read_at = $3 \
             WHERE user_id = $1 AND id = ANY($2) AND NOT read",
        )
        .bind(user_id)
        .bind(uuids(ids))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to bulk mark read", e))?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, user_id: UserId, id: NotificationId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete notification", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, user_id: UserId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete notifications", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn delete_read(&self, user_id: UserId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1 AND read")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete read notifications", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn delete_bulk(&self, user_id: UserId, ids: &[NotificationId]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(uuids(ids))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to bulk delete notifications", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn delete_read_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE read AND created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to clean up notifications", e)
            })?;
        Ok(result.rows_affected())
    }
}
