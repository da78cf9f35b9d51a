//! Day-bucket arithmetic for reminder offsets.
//!
//! A reminder with offset `d` is due while the calendar-day difference (UTC)
//! between the target date and now equals `d` and the target is still ahead.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use subtrack_core::config::reminder::ReminderConfig;
use subtrack_entity::subscription::{Subscription, SubscriptionStatus};

/// Calendar days between `now` and `target`, in UTC.
pub fn day_bucket(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (target.date_naive() - now.date_naive()).num_days()
}

/// The offset whose bucket `target` is currently in, if any.
///
/// Buckets are UTC calendar days, not the interval
/// `target - now ∈ [d - 1 day, d days]`. At 01:00 a renewal 46 hours
/// away falls on the next calendar day, so it is due for `d = 1`.
pub fn due_offset(offsets: &[i64], target: DateTime<Utc>, now: DateTime<Utc>) -> Option<i64> {
    if target <= now {
        return None;
    }
    let bucket = day_bucket(target, now);
    offsets.iter().copied().find(|d| *d == bucket)
}

/// Midnight UTC of the day on which `target` enters bucket `offset`.
fn bucket_start(target: DateTime<Utc>, offset: i64) -> DateTime<Utc> {
    (target.date_naive() - Duration::days(offset))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// When the subscription next needs evaluating: the start of the next
/// offset bucket, or the renewal instant itself for the expiry check.
///
/// `None` for subscriptions that receive no reminders.
pub fn next_fire_at(
    subscription: &Subscription,
    config: &ReminderConfig,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if !subscription.status.receives_reminders() {
        return None;
    }

    let mut candidates: Vec<DateTime<Utc>> = config
        .renewal_offsets_days
        .iter()
        .map(|d| bucket_start(subscription.renewal_date, *d))
        .collect();
    candidates.push(subscription.renewal_date);

    if subscription.status == SubscriptionStatus::Trial {
        if let Some(trial_end) = subscription.trial_end_date.filter(|t| *t > now) {
            candidates.extend(
                config
                    .trial_offsets_days
                    .iter()
                    .map(|d| bucket_start(trial_end, *d)),
            );
        }
    }

    candidates.into_iter().filter(|at| *at > now).min()
}
