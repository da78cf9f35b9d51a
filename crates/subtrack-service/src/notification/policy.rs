//! Fixed priority policy per event.

use subtrack_entity::notification::{EventFacts, NotificationPriority};
use subtrack_entity::subscription::SubscriptionStatus;

/// Priority assigned to a notification generated from `facts`.
pub fn priority_for(facts: &EventFacts) -> NotificationPriority {
    use NotificationPriority::{High, Low, Medium};

    match facts {
        EventFacts::Renewal {
            days_until_renewal, ..
        } => {
            if *days_until_renewal <= 1 {
                High
            } else {
                Medium
            }
        }
        EventFacts::TrialEnding { .. } => High,
        EventFacts::PriceChange {
            old_price,
            new_price,
            ..
        } => {
            if new_price > old_price {
                Medium
            } else {
                Low
            }
        }
        EventFacts::StatusChange {
            old_status,
            new_status,
            ..
        } => match (old_status, new_status) {
            (_, SubscriptionStatus::Expired | SubscriptionStatus::Suspended) => High,
            (SubscriptionStatus::Trial, SubscriptionStatus::Active) => Medium,
            (_, SubscriptionStatus::Active) => Low,
            (_, SubscriptionStatus::Cancelled | SubscriptionStatus::Trial) => Low,
        },
        EventFacts::PaymentFailed { .. } => High,
        EventFacts::PaymentSuccess { .. } => Low,
        EventFacts::PaymentDue { .. } => Medium,
        EventFacts::PaymentOverdue { .. } => High,
        EventFacts::SubscriptionAdded { .. } => Low,
        EventFacts::SpendingAlert { .. } => High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(old: SubscriptionStatus, new: SubscriptionStatus) -> EventFacts {
        EventFacts::StatusChange {
            subscription_name: "Disney+".to_string(),
            old_status: old,
            new_status: new,
        }
    }

    fn price(old: f64, new: f64) -> EventFacts {
        EventFacts::PriceChange {
            subscription_name: "Disney+".to_string(),
            currency: "USD".to_string(),
            old_price: old,
            new_price: new,
        }
    }

    #[test]
    fn test_price_change_asymmetry() {
        assert_eq!(priority_for(&price(10.0, 12.0)), NotificationPriority::Medium);
        assert_eq!(priority_for(&price(12.0, 10.0)), NotificationPriority::Low);
    }

    #[test]
    fn test_status_change_table() {
        use SubscriptionStatus::*;
        assert_eq!(priority_for(&status(Active, Expired)), NotificationPriority::High);
        assert_eq!(priority_for(&status(Active, Suspended)), NotificationPriority::High);
        assert_eq!(priority_for(&status(Active, Cancelled)), NotificationPriority::Low);
        assert_eq!(priority_for(&status(Trial, Active)), NotificationPriority::Medium);
        assert_eq!(priority_for(&status(Suspended, Active)), NotificationPriority::Low);
        assert_eq!(priority_for(&status(Active, Trial)), NotificationPriority::Low);
    }
}
