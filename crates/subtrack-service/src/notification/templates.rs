//! Title and message templates per event.

use chrono::{DateTime, Utc};

use subtrack_entity::notification::EventFacts;
use subtrack_entity::notification::facts::percent_change;
use subtrack_entity::subscription::{BillingFrequency, SubscriptionStatus};

/// Rendered text of a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub title: String,
    pub message: String,
}

/// Render the title and message for `facts`.
pub fn render(facts: &EventFacts) -> Rendered {
    match facts {
        EventFacts::Renewal {
            subscription_name,
            price,
            currency,
            renewal_date,
            days_until_renewal,
        } => Rendered {
            title: format!("{subscription_name} renews {}", relative_days(*days_until_renewal)),
            message: format!(
                "Your {subscription_name} subscription renews on {} for {}.",
                human_date(*renewal_date),
                money(*price, currency)
            ),
        },
        EventFacts::TrialEnding {
            subscription_name,
            price,
            currency,
            trial_end_date,
            days_remaining,
        } => Rendered {
            title: format!(
                "{subscription_name} trial ends {}",
                relative_days(*days_remaining)
            ),
            message: format!(
                "Your free trial of {subscription_name} ends on {}. After that you will be charged {}.",
                human_date(*trial_end_date),
                money(*price, currency)
            ),
        },
        EventFacts::PriceChange {
            subscription_name,
            currency,
            old_price,
            new_price,
        } => {
            let direction = if new_price > old_price {
                "increased"
            } else {
                "decreased"
            };
            let delta = percent_change(*old_price, *new_price)
                .map(|pct| format!(" ({pct:+.2}%)"))
                .unwrap_or_default();
            Rendered {
                title: format!("{subscription_name} price {direction}"),
                message: format!(
                    "{subscription_name} now costs {} instead of {}{delta}.",
                    money(*new_price, currency),
                    money(*old_price, currency)
                ),
            }
        }
        EventFacts::StatusChange {
            subscription_name,
            old_status,
            new_status,
        } => Rendered {
            title: format!("{subscription_name} {}", status_phrase(*new_status)),
            message: format!(
                "The status of {subscription_name} changed from {old_status} to {new_status}."
            ),
        },
        EventFacts::PaymentFailed {
            subscription_name,
            amount,
            currency,
            reason,
            ..
        } => Rendered {
            title: format!("Payment failed for {subscription_name}"),
            message: match reason {
                Some(reason) => format!(
                    "We could not process your payment of {} for {subscription_name}: {reason}.",
                    money(*amount, currency)
                ),
                None => format!(
                    "We could not process your payment of {} for {subscription_name}.",
                    money(*amount, currency)
                ),
            },
        },
        EventFacts::PaymentSuccess {
            subscription_name,
            amount,
            currency,
            ..
        } => Rendered {
            title: format!("Payment received for {subscription_name}"),
            message: format!(
                "Your payment of {} for {subscription_name} went through.",
                money(*amount, currency)
            ),
        },
        EventFacts::PaymentDue {
            subscription_name,
            amount,
            currency,
            due_date,
            ..
        } => Rendered {
            title: format!("Payment due for {subscription_name}"),
            message: format!(
                "Your share of {} for {subscription_name} is due on {}.",
                money(*amount, currency),
                human_date(*due_date)
            ),
        },
        EventFacts::PaymentOverdue {
            subscription_name,
            amount,
            currency,
            due_date,
            ..
        } => Rendered {
            title: format!("Payment overdue for {subscription_name}"),
            message: format!(
                "Your share of {} for {subscription_name} was due on {} and has not been paid.",
                money(*amount, currency),
                human_date(*due_date)
            ),
        },
        EventFacts::SubscriptionAdded {
            subscription_name,
            price,
            currency,
            frequency,
            renewal_date,
        } => Rendered {
            title: format!("{subscription_name} added"),
            message: format!(
                "You are now tracking {subscription_name} at {} per {}. Next renewal on {}.",
                money(*price, currency),
                period_noun(*frequency),
                human_date(*renewal_date)
            ),
        },
        EventFacts::SpendingAlert {
            amount,
            threshold,
            currency,
        } => Rendered {
            title: "Spending alert".to_string(),
            message: format!(
                "Your subscriptions cost {}, above your limit of {}.",
                money(*amount, currency),
                money(*threshold, currency)
            ),
        },
    }
}

fn relative_days(days: i64) -> String {
    match days {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        n => format!("in {n} days"),
    }
}

fn status_phrase(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "is now active",
        SubscriptionStatus::Trial => "is in a free trial",
        SubscriptionStatus::Suspended => "was suspended",
        SubscriptionStatus::Cancelled => "was cancelled",
        SubscriptionStatus::Expired => "has expired",
    }
}

fn period_noun(frequency: BillingFrequency) -> &'static str {
    match frequency {
        BillingFrequency::Daily => "day",
        BillingFrequency::Weekly => "week",
        BillingFrequency::Monthly => "month",
        BillingFrequency::Quarterly => "quarter",
        BillingFrequency::Yearly => "year",
    }
}

fn human_date(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn money(amount: f64, currency: &str) -> String {
    format!("{amount:.2} {currency}")
}
