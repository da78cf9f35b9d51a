//! In-memory payment store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use subtrack_core::result::AppResult;
use subtrack_core::types::id::{GroupId, PaymentId};
use subtrack_entity::payment::{Payment, PaymentStatus};

use crate::store::PaymentStore;

#[derive(Debug, Default)]
pub struct MemoryPaymentStore {
    rows: DashMap<PaymentId, Payment>,
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn insert(&self, payment: Payment) -> AppResult<Payment> {
        self.rows.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn insert_many(&self, payments: Vec<Payment>) -> AppResult<Vec<Payment>> {
        for payment in &payments {
            self.rows.insert(payment.id, payment.clone());
        }
        Ok(payments)
    }

    async fn find_by_id(&self, id: PaymentId) -> AppResult<Option<Payment>> {
        Ok(self.rows.get(&id).map(|p| p.clone()))
    }

    async fn mark_paid(
        &self,
        id: PaymentId,
        method: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Payment>> {
        let Some(mut row) = self.rows.get_mut(&id) else {
            return Ok(None);
        };
        if row.status.is_terminal() {
            return Ok(None);
        }
        row.status = PaymentStatus::Paid;
        row.paid_date = Some(now);
        row.payment_method = method;
        row.updated_at = now;
        Ok(Some(row.clone()))
    }

    async fn set_status(
        &self,
        id: PaymentId,
        expected: PaymentStatus,
        next: PaymentStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Payment>> {
        let Some(mut row) = self.rows.get_mut(&id) else {
            return Ok(None);
        };
        if row.status != expected {
            return Ok(None);
        }
        row.status = next;
        row.updated_at = now;
        Ok(Some(row.clone()))
    }

    async fn record_reminder(&self, id: PaymentId, now: DateTime<Utc>) -> AppResult<Option<Payment>> {
        let Some(mut row) = self.rows.get_mut(&id) else {
            return Ok(None);
        };
        if row.status.is_terminal() {
            return Ok(None);
        }
        row.reminders_sent += 1;
        row.last_reminder_date = Some(now);
        row.updated_at = now;
        Ok(Some(row.clone()))
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Payment>> {
        let mut changed = Vec::new();
        for mut row in self.rows.iter_mut() {
            if row.is_past_due(now) {
                row.status = PaymentStatus::Overdue;
                row.updated_at = now;
                changed.push(row.clone());
            }
        }
        Ok(changed)
    }

    async fn list_for_group(
        &self,
        group_id: GroupId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .rows
            .iter()
            .filter(|p| p.group_id == group_id && p.due_date >= start && p.due_date <= end)
            .map(|p| p.clone())
            .collect();
        payments.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.created_at.cmp(&b.created_at)));
        Ok(payments)
    }
}
