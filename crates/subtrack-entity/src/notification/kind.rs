//! Notification kind enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a notification.
///
/// `Success`, `Warning` and `Info` form the status-change family; which one
/// is used depends on the new subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Upcoming renewal.
    Renewal,
    /// Free trial about to end.
    TrialEnding,
    /// Subscription price changed.
    PriceChange,
    /// Positive status change.
    Success,
    /// Status change that needs attention.
    Warning,
    /// Neutral status change.
    Info,
    /// A provider payment failed.
    PaymentFailed,
    /// A payment went through.
    PaymentSuccess,
    /// A shared-cost payment is due.
    PaymentDue,
    /// A shared-cost payment is overdue.
    PaymentOverdue,
    /// A new subscription was added.
    SubscriptionAdded,
    /// Spending crossed a configured threshold.
    SpendingAlert,
}

impl NotificationKind {
    /// Return the kind as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Renewal => "renewal",
            Self::TrialEnding => "trial_ending",
            Self::PriceChange => "price_change",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::PaymentFailed => "payment_failed",
            Self::PaymentSuccess => "payment_success",
            Self::PaymentDue => "payment_due",
            Self::PaymentOverdue => "payment_overdue",
            Self::SubscriptionAdded => "subscription_added",
            Self::SpendingAlert => "spending_alert",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "renewal" => Ok(Self::Renewal),
            "trial_ending" => Ok(Self::TrialEnding),
            "price_change" => Ok(Self::PriceChange),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "payment_failed" => Ok(Self::PaymentFailed),
            "payment_success" => Ok(Self::PaymentSuccess),
            "payment_due" => Ok(Self::PaymentDue),
            "payment_overdue" => Ok(Self::PaymentOverdue),
            "subscription_added" => Ok(Self::SubscriptionAdded),
            "spending_alert" => Ok(Self::SpendingAlert),
            other => Err(format!("Unknown notification kind: {other}")),
        }
    }
}
