//! Event catalog: the facts each notification kind is generated from.
//!
//! Facts are plain data. [`EventFacts::validate`] performs the structural
//! checks that must pass before anything is stored, and the remaining
//! methods derive the notification kind, the dedup discriminator and the
//! persisted metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtrack_core::AppError;
use subtrack_core::types::id::{GroupId, PaymentId};

use super::kind::NotificationKind;
use super::metadata::NotificationMetadata;
use crate::subscription::{BillingFrequency, SubscriptionStatus};

/// Facts describing one notification-worthy event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventFacts {
    /// A renewal is `days_until_renewal` calendar days away.
    Renewal {
        subscription_name: String,
        price: f64,
        currency: String,
        renewal_date: DateTime<Utc>,
        days_until_renewal: i64,
    },
    /// A free trial ends in `days_remaining` calendar days.
    TrialEnding {
        subscription_name: String,
        price: f64,
        currency: String,
        trial_end_date: DateTime<Utc>,
        days_remaining: i64,
    },
    /// The price per period changed.
    PriceChange {
        subscription_name: String,
        currency: String,
        old_price: f64,
        new_price: f64,
    },
    /// The lifecycle status changed.
    StatusChange {
        subscription_name: String,
        old_status: SubscriptionStatus,
        new_status: SubscriptionStatus,
    },
    /// A provider payment failed.
    PaymentFailed {
        subscription_name: String,
        amount: f64,
        currency: String,
        #[serde(default)]
        payment_id: Option<PaymentId>,
        #[serde(default)]
        reason: Option<String>,
    },
    /// A payment went through.
    PaymentSuccess {
        subscription_name: String,
        amount: f64,
        currency: String,
        #[serde(default)]
        payment_id: Option<PaymentId>,
    },
    /// A shared-cost payment is due.
    PaymentDue {
        subscription_name: String,
        amount: f64,
        currency: String,
        payment_id: PaymentId,
        group_id: GroupId,
        due_date: DateTime<Utc>,
    },
    /// A shared-cost payment passed its due date.
    PaymentOverdue {
        subscription_name: String,
        amount: f64,
        currency: String,
        payment_id: PaymentId,
        group_id: GroupId,
        due_date: DateTime<Utc>,
    },
    /// A subscription was added.
    SubscriptionAdded {
        subscription_name: String,
        price: f64,
        currency: String,
        frequency: BillingFrequency,
        renewal_date: DateTime<Utc>,
    },
    /// Spending over a period crossed a threshold.
    SpendingAlert {
        amount: f64,
        threshold: f64,
        currency: String,
    },
}

impl EventFacts {
    /// Structural validation performed before any storage access.
    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            Self::Renewal {
                subscription_name,
                price,
                currency,
                days_until_renewal,
                ..
            } => {
                require_name(subscription_name)?;
                require_currency(currency)?;
                require_amount("price", *price)?;
                require_days("days_until_renewal", *days_until_renewal)
            }
            Self::TrialEnding {
                subscription_name,
                price,
                currency,
                days_remaining,
                ..
            } => {
                require_name(subscription_name)?;
                require_currency(currency)?;
                require_amount("price", *price)?;
                require_days("days_remaining", *days_remaining)
            }
            Self::PriceChange {
                subscription_name,
                currency,
                old_price,
                new_price,
            } => {
                require_name(subscription_name)?;
                require_currency(currency)?;
                require_amount("old_price", *old_price)?;
                require_amount("new_price", *new_price)?;
                if old_price == new_price {
                    return Err(AppError::validation(
                        "Price change requires different old and new prices",
                    ));
                }
                Ok(())
            }
            Self::StatusChange {
                subscription_name,
                old_status,
                new_status,
            } => {
                require_name(subscription_name)?;
                if old_status == new_status {
                    return Err(AppError::validation(
                        "Status change requires different old and new statuses",
                    ));
                }
                Ok(())
            }
            Self::PaymentFailed {
                subscription_name,
                amount,
                currency,
                ..
            }
            | Self::PaymentSuccess {
                subscription_name,
                amount,
                currency,
                ..
            }
            | Self::PaymentDue {
                subscription_name,
                amount,
                currency,
                ..
            }
            | Self::PaymentOverdue {
                subscription_name,
                amount,
                currency,
                ..
            } => {
                require_name(subscription_name)?;
                require_currency(currency)?;
                require_amount("amount", *amount)
            }
            Self::SubscriptionAdded {
                subscription_name,
                price,
                currency,
                ..
            } => {
                require_name(subscription_name)?;
                require_currency(currency)?;
                require_amount("price", *price)
            }
            Self::SpendingAlert {
                amount,
                threshold,
                currency,
            } => {
                require_currency(currency)?;
                require_amount("amount", *amount)?;
                require_amount("threshold", *threshold)
            }
        }
    }

    /// The notification kind these facts produce.
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Renewal { .. } => NotificationKind::Renewal,
            Self::TrialEnding { .. } => NotificationKind::TrialEnding,
            Self::PriceChange { .. } => NotificationKind::PriceChange,
            Self::StatusChange { new_status, .. } => match new_status {
                SubscriptionStatus::Active => NotificationKind::Success,
                SubscriptionStatus::Expired | SubscriptionStatus::Suspended => {
                    NotificationKind::Warning
                }
                SubscriptionStatus::Cancelled | SubscriptionStatus::Trial => {
                    NotificationKind::Info
                }
            },
            Self::PaymentFailed { .. } => NotificationKind::PaymentFailed,
            Self::PaymentSuccess { .. } => NotificationKind::PaymentSuccess,
            Self::PaymentDue { .. } => NotificationKind::PaymentDue,
            Self::PaymentOverdue { .. } => NotificationKind::PaymentOverdue,
            Self::SubscriptionAdded { .. } => NotificationKind::SubscriptionAdded,
            Self::SpendingAlert { .. } => NotificationKind::SpendingAlert,
        }
    }

    /// The fact that distinguishes two otherwise identical events of the same kind.
    ///
    /// `None` means the kind alone (within the dedup window) identifies the event.
    pub fn discriminator(&self) -> Option<String> {
        match self {
            Self::Renewal {
                days_until_renewal, ..
            } => Some(format!("d{days_until_renewal}")),
            Self::TrialEnding { days_remaining, .. } => Some(format!("d{days_remaining}")),
            Self::PriceChange {
                old_price,
                new_price,
                ..
            } => Some(format!("{old_price:.2}->{new_price:.2}")),
            Self::StatusChange {
                old_status,
                new_status,
                ..
            } => Some(format!("{old_status}->{new_status}")),
            Self::PaymentFailed { payment_id, .. } | Self::PaymentSuccess { payment_id, .. } => {
                payment_id.map(|id| id.to_string())
            }
            Self::PaymentDue { payment_id, .. } | Self::PaymentOverdue { payment_id, .. } => {
                Some(payment_id.to_string())
            }
            Self::SubscriptionAdded { .. } | Self::SpendingAlert { .. } => None,
        }
    }

    /// Metadata persisted with the notification.
    pub fn metadata(&self) -> NotificationMetadata {
        match self {
            Self::Renewal {
                subscription_name,
                price,
                currency,
                renewal_date,
                days_until_renewal,
            } => NotificationMetadata {
                subscription_name: Some(subscription_name.clone()),
                amount: Some(*price),
                currency: Some(currency.clone()),
                renewal_date: Some(*renewal_date),
                days_until_renewal: Some(*days_until_renewal),
                ..Default::default()
            },
            Self::TrialEnding {
                subscription_name,
                price,
                currency,
                trial_end_date,
                days_remaining,
            } => NotificationMetadata {
                subscription_name: Some(subscription_name.clone()),
                amount: Some(*price),
                currency: Some(currency.clone()),
                renewal_date: Some(*trial_end_date),
                days_until_renewal: Some(*days_remaining),
                ..Default::default()
            },
            Self::PriceChange {
                subscription_name,
                currency,
                old_price,
                new_price,
            } => NotificationMetadata {
                subscription_name: Some(subscription_name.clone()),
                currency: Some(currency.clone()),
                amount: Some(*new_price),
                old_price: Some(*old_price),
                new_price: Some(*new_price),
                percent_change: percent_change(*old_price, *new_price),
                ..Default::default()
            },
            Self::StatusChange {
                subscription_name,
                old_status,
                new_status,
            } => NotificationMetadata {
                subscription_name: Some(subscription_name.clone()),
                old_status: Some(*old_status),
                new_status: Some(*new_status),
                ..Default::default()
            },
            Self::PaymentFailed {
                subscription_name,
                amount,
                currency,
                payment_id,
                reason,
            } => NotificationMetadata {
                subscription_name: Some(subscription_name.clone()),
                amount: Some(*amount),
                currency: Some(currency.clone()),
                payment_id: *payment_id,
                reason: reason.clone(),
                ..Default::default()
            },
            Self::PaymentSuccess {
                subscription_name,
                amount,
                currency,
                payment_id,
            } => NotificationMetadata {
                subscription_name: Some(subscription_name.clone()),
                amount: Some(*amount),
                currency: Some(currency.clone()),
                payment_id: *payment_id,
                ..Default::default()
            },
            Self::PaymentDue {
                subscription_name,
                amount,
                currency,
                payment_id,
                group_id,
                due_date,
            }
            | Self::PaymentOverdue {
                subscription_name,
                amount,
                currency,
                payment_id,
                group_id,
                due_date,
            } => NotificationMetadata {
                subscription_name: Some(subscription_name.clone()),
                amount: Some(*amount),
                currency: Some(currency.clone()),
                payment_id: Some(*payment_id),
                group_id: Some(*group_id),
                due_date: Some(*due_date),
                ..Default::default()
            },
            Self::SubscriptionAdded {
                subscription_name,
                price,
                currency,
                renewal_date,
                ..
            } => NotificationMetadata {
                subscription_name: Some(subscription_name.clone()),
                amount: Some(*price),
                currency: Some(currency.clone()),
                renewal_date: Some(*renewal_date),
                ..Default::default()
            },
            Self::SpendingAlert {
                amount,
                threshold,
                currency,
            } => NotificationMetadata {
                amount: Some(*amount),
                threshold: Some(*threshold),
                currency: Some(currency.clone()),
                ..Default::default()
            },
        }
    }
}

/// Signed percentage delta rounded to two decimals; `None` when `old` is zero.
pub fn percent_change(old: f64, new: f64) -> Option<f64> {
    if old == 0.0 {
        return None;
    }
    Some(((new - old) / old * 10_000.0).round() / 100.0)
}

fn require_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::validation("subscription_name must not be empty"));
    }
    Ok(())
}

fn require_currency(currency: &str) -> Result<(), AppError> {
    if currency.trim().is_empty() {
        return Err(AppError::validation("currency must not be empty"));
    }
    Ok(())
}

fn require_amount(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be a finite, non-negative number"
        )));
    }
    Ok(())
}

fn require_days(field: &str, value: i64) -> Result<(), AppError> {
    if value < 0 {
        return Err(AppError::validation(format!("{field} must not be negative")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_change(old: f64, new: f64) -> EventFacts {
        EventFacts::PriceChange {
            subscription_name: "Spotify".to_string(),
            currency: "USD".to_string(),
            old_price: old,
            new_price: new,
        }
    }

    #[test]
    fn test_equal_prices_rejected() {
        assert!(price_change(10.0, 10.0).validate().is_err());
        assert!(price_change(10.0, 12.0).validate().is_ok());
    }

    #[test]
    fn test_non_finite_amount_rejected() {
        assert!(price_change(f64::NAN, 12.0).validate().is_err());
        assert!(price_change(10.0, f64::INFINITY).validate().is_err());
        assert!(price_change(-1.0, 12.0).validate().is_err());
    }

    #[test]
    fn test_status_change_kind_mapping() {
        let facts = |old, new| EventFacts::StatusChange {
            subscription_name: "Hulu".to_string(),
            old_status: old,
            new_status: new,
        };
        use SubscriptionStatus::*;
        assert_eq!(facts(Active, Expired).kind(), NotificationKind::Warning);
        assert_eq!(facts(Active, Suspended).kind(), NotificationKind::Warning);
        assert_eq!(facts(Active, Cancelled).kind(), NotificationKind::Info);
        assert_eq!(facts(Trial, Active).kind(), NotificationKind::Success);
        assert_eq!(facts(Active, Trial).kind(), NotificationKind::Info);
        assert!(facts(Active, Active).validate().is_err());
    }

    #[test]
    fn test_price_change_metadata() {
        let meta = price_change(10.0, 12.0).metadata();
        assert_eq!(meta.old_price, Some(10.0));
        assert_eq!(meta.new_price, Some(12.0));
        assert_eq!(meta.percent_change, Some(20.0));
    }

    #[test]
    fn test_discriminator_distinguishes_days() {
        let renewal = |days| EventFacts::Renewal {
            subscription_name: "Netflix".to_string(),
            price: 9.99,
            currency: "USD".to_string(),
            renewal_date: Utc::now(),
            days_until_renewal: days,
        };
        assert_ne!(renewal(3).discriminator(), renewal(1).discriminator());
        assert_eq!(renewal(1).discriminator().as_deref(), Some("d1"));
    }

    #[test]
    fn test_facts_deserialize_from_tagged_json() {
        let json = serde_json::json!({
            "event": "spending_alert",
            "amount": 250.0,
            "threshold": 200.0,
            "currency": "EUR"
        });
        let facts: EventFacts = serde_json::from_value(json).unwrap();
        assert_eq!(facts.kind(), NotificationKind::SpendingAlert);
        assert!(facts.discriminator().is_none());
    }
}
