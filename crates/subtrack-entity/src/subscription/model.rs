//! Subscription entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use subtrack_core::AppError;
use subtrack_core::types::id::{SubscriptionId, UserId};

use super::frequency::BillingFrequency;
use super::status::SubscriptionStatus;

/// A recurring financial obligation owned by a user.
///
/// Subscriptions are maintained by the surrounding CRUD layer; the engine
/// reads them and only ever writes the `expired` transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    /// Unique subscription identifier.
    pub id: SubscriptionId,
    /// Owning user.
    pub user_id: UserId,
    /// Display name (e.g., "Netflix").
    pub name: String,
    /// Price per billing period.
    pub price: f64,
    /// ISO currency code.
    pub currency: String,
    /// Billing frequency.
    pub frequency: BillingFrequency,
    /// When the subscription started.
    pub start_date: DateTime<Utc>,
    /// Next renewal instant.
    pub renewal_date: DateTime<Utc>,
    /// End of the free trial, if any.
    pub trial_end_date: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: SubscriptionStatus,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the renewal instant has passed.
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.renewal_date <= now
    }
}

/// Input for creating a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionDraft {
    /// Owning user.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Price per billing period.
    pub price: f64,
    /// ISO currency code.
    pub currency: String,
    /// Billing frequency.
    pub frequency: BillingFrequency,
    /// Start instant.
    pub start_date: DateTime<Utc>,
    /// Renewal instant; derived from the frequency when missing.
    pub renewal_date: Option<DateTime<Utc>>,
    /// End of the free trial, if any.
    pub trial_end_date: Option<DateTime<Utc>>,
    /// Initial status.
    pub status: SubscriptionStatus,
}

impl SubscriptionDraft {
    /// Validate the draft and turn it into a stored subscription.
    pub fn into_subscription(self, now: DateTime<Utc>) -> Result<Subscription, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Subscription name must not be empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::validation(
                "Subscription price must be a non-negative number",
            ));
        }
        let renewal_date = match self.renewal_date {
            Some(date) => date,
            None => self.frequency.advance(self.start_date).ok_or_else(|| {
                AppError::validation("Renewal date is out of the representable range")
            })?,
        };
        if renewal_date <= self.start_date {
            return Err(AppError::validation(
                "Renewal date must be after the start date",
            ));
        }

        Ok(Subscription {
            id: SubscriptionId::new(),
            user_id: self.user_id,
            name: self.name,
            price: self.price,
            currency: self.currency,
            frequency: self.frequency,
            start_date: self.start_date,
            renewal_date,
            trial_end_date: self.trial_end_date,
            status: self.status,
            created_at: now,
            updated_at: now,
        })
    }
}
