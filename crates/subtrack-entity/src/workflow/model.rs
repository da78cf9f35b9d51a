//! Reminder workflow record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use subtrack_core::types::id::{SubscriptionId, WorkflowHandle};

/// Scheduling state for one subscription's reminder timeline.
///
/// `version` increments on every write; writers must present the version
/// they read (optimistic concurrency).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ReminderWorkflow {
    pub subscription_id: SubscriptionId,
    /// Handle of the currently scheduled callback.
    pub handle: Option<WorkflowHandle>,
    /// When the scheduled callback should fire.
    pub next_fire_at: Option<DateTime<Utc>>,
    /// When reminders were last evaluated.
    pub last_evaluated_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl ReminderWorkflow {
    /// The state of a subscription that has never been scheduled.
    pub fn empty(subscription_id: SubscriptionId, now: DateTime<Utc>) -> Self {
        Self {
            subscription_id,
            handle: None,
            next_fire_at: None,
            last_evaluated_at: None,
            version: 0,
            updated_at: now,
        }
    }
}
