//! Typed job payload definitions.

use serde::{Deserialize, Serialize};
use subtrack_core::types::id::SubscriptionId;

/// Typed payloads for known job types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job_type", rename_all = "snake_case")]
pub enum JobPayload {
    /// Delayed reminder callback for one subscription.
    ReminderCallback {
        subscription_id: SubscriptionId,
    },
    /// Promote past-due pending payments to overdue.
    OverdueSweep,
    /// Evaluate every active/trial subscription.
    ReminderSweep,
    /// Delete read notifications past retention.
    NotificationCleanup,
    /// Purge finished jobs.
    JobCleanup,
}

impl JobPayload {
    /// The `job_type` column value for this payload.
    pub fn job_type(&self) -> &'static str {
        match self {
            Self::ReminderCallback { .. } => "reminder_callback",
            Self::OverdueSweep => "overdue_sweep",
            Self::ReminderSweep => "reminder_sweep",
            Self::NotificationCleanup => "notification_cleanup",
            Self::JobCleanup => "job_cleanup",
        }
    }
}
