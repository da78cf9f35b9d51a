//! Payment entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use subtrack_core::types::id::{GroupId, PaymentId, SubscriptionId, UserId};

use super::status::PaymentStatus;

/// One member's share of a shared subscription for one billing period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub group_id: GroupId,
    pub subscription_id: SubscriptionId,
    /// The member who owes this amount.
    pub payer_id: UserId,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub due_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub reminders_sent: i32,
    pub last_reminder_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Whether the automatic overdue sweep would promote this payment.
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.status == PaymentStatus::Pending && self.due_date < now
    }
}

/// Data required to create a new payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayment {
    pub group_id: GroupId,
    pub subscription_id: SubscriptionId,
    pub payer_id: UserId,
    pub amount: f64,
    pub currency: String,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreatePayment {
    /// Build the pending row.
    pub fn into_payment(self, now: DateTime<Utc>) -> Payment {
        Payment {
            id: PaymentId::new(),
            group_id: self.group_id,
            subscription_id: self.subscription_id,
            payer_id: self.payer_id,
            amount: self.amount,
            currency: self.currency,
            status: PaymentStatus::Pending,
            due_date: self.due_date,
            paid_date: None,
            payment_method: None,
            reminders_sent: 0,
            last_reminder_date: None,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}
