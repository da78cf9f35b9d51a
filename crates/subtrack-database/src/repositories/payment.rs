//! Payment repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use subtrack_core::error::{AppError, ErrorKind};
use subtrack_core::result::AppResult;
use subtrack_core::types::id::{GroupId, PaymentId};
use subtrack_entity::payment::{Payment, PaymentStatus};

use crate::store::PaymentStore;

const INSERT_PAYMENT: &str = "INSERT INTO payments \
     (id, group_id, subscription_id, payer_id, amount, currency, status, due_date, paid_date, \
      payment_method, reminders_sent, last_reminder_date, notes, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) RETURNING *";

/// PostgreSQL payment store.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    /// Create a new payment repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_in(tx: &mut Transaction<'_, Postgres>, p: &Payment) -> AppResult<Payment> {
        sqlx::query_as::<_, Payment>(INSERT_PAYMENT)
            .bind(p.id)
            .bind(p.group_id)
            .bind(p.subscription_id)
            .bind(p.payer_id)
            .bind(p.amount)
            .bind(&p.currency)
            .bind(p.status)
            .bind(p.due_date)
            .bind(p.paid_date)
            .bind(&p.payment_method)
            .bind(p.reminders_sent)
            .bind(p.last_reminder_date)
            .bind(&p.notes)
            .bind(p.created_at)
            .bind(p.updated_at)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert payment", e))
    }
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    async fn insert(&self, payment: Payment) -> AppResult<Payment> {
        let mut inserted = self.insert_many(vec![payment]).await?;
        inserted
            .pop()
            .ok_or_else(|| AppError::internal("Insert returned no payment"))
    }

    async fn insert_many(&self, payments: Vec<Payment>) -> AppResult<Vec<Payment>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        let mut inserted = Vec::with_capacity(payments.len());
        for payment in &payments {
            inserted.push(Self::insert_in(&mut tx, payment).await?);
        }
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })?;
        Ok(inserted)
    }

    async fn find_by_id(&self, id: PaymentId) -> AppResult<Option<Payment>> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find payment", e))
    }

    async fn mark_paid(
        &self,
        id: PaymentId,
        method: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Payment>> {
        sqlx::query_as::<_, Payment>(
            "UPDATE payments SET status = 'paid', paid_date = $3, payment_method = $2, updated_at = $3 \
             WHERE id = $1 AND status IN ('pending', 'overdue') RETURNING *",
        )
        .bind(id)
        .bind(method)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark payment paid", e))
    }

    async fn set_status(
        &self,
        id: PaymentId,
        expected: PaymentStatus,
        next: PaymentStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Payment>> {
        sqlx::query_as::<_, Payment>(
            "UPDATE payments SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 RETURNING *",
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update payment status", e))
    }

    async fn record_reminder(&self, id: PaymentId, now: DateTime<Utc>) -> AppResult<Option<Payment>> {
        sqlx::query_as::<_, Payment>(
            "UPDATE payments SET reminders_sent = reminders_sent + 1, last_reminder_date = $2, \
             updated_at = $2 WHERE id = $1 AND status IN ('pending', 'overdue') RETURNING *",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record reminder", e))
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Payment>> {
        sqlx::query_as::<_, Payment>(
            "UPDATE payments SET status = 'overdue', updated_at = $1 \
             WHERE status = 'pending' AND due_date < $1 RETURNING *",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to sweep overdue payments", e))
    }

    async fn list_for_group(
        &self,
        group_id: GroupId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Payment>> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE group_id = $1 AND due_date >= $2 AND due_date <= $3 \
             ORDER BY due_date, created_at",
        )
        .bind(group_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list group payments", e))
    }
}
