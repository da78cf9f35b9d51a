//! Subscription repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use subtrack_core::error::{AppError, ErrorKind};
use subtrack_core::result::AppResult;
use subtrack_core::types::id::SubscriptionId;
use subtrack_entity::subscription::{Subscription, SubscriptionStatus};

use crate::store::SubscriptionStore;

/// PostgreSQL subscription store.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    /// Create a new subscription repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for SubscriptionRepository {
    async fn find_by_id(&self, id: SubscriptionId) -> AppResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find subscription", e))
    }

    async fn list_remindable(&self) -> AppResult<Vec<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE status IN ('trial', 'active') ORDER BY renewal_date",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list subscriptions", e))
    }

    async fn insert(&self, s: Subscription) -> AppResult<Subscription> {
        sqlx::query_as::<_, Subscription>(
            "INSERT INTO subscriptions \
             (id, user_id, name, price, currency, frequency, start_date, renewal_date, \
              trial_end_date, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
        )
        .bind(s.id)
        .bind(s.user_id)
        .bind(&s.name)
        .bind(s.price)
        .bind(&s.currency)
        .bind(s.frequency)
        .bind(s.start_date)
        .bind(s.renewal_date)
        .bind(s.trial_end_date)
        .bind(s.status)
        .bind(s.created_at)
        .bind(s.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert subscription", e))
    }

    async fn update(&self, s: Subscription) -> AppResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            "UPDATE subscriptions SET name = $2, price = $3, currency = $4, frequency = $5, \
             start_date = $6, renewal_date = $7, trial_end_date = $8, status = $9, updated_at = $10 \
             WHERE id = $1 RETURNING *",
        )
        .bind(s.id)
        .bind(&s.name)
        .bind(s.price)
        .bind(&s.currency)
        .bind(s.frequency)
        .bind(s.start_date)
        .bind(s.renewal_date)
        .bind(s.trial_end_date)
        .bind(s.status)
        .bind(s.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update subscription", e))
    }

    async fn transition_status(
        &self,
        id: SubscriptionId,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            "UPDATE subscriptions SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 RETURNING *",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update subscription status", e)
        })
    }
}
