//! Delayed-callback scheduler consumed by the reminder workflow.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::types::id::{SubscriptionId, WorkflowHandle};

/// State of a scheduled callback as reported by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduledCallbackStatus {
    /// Waiting for its fire time.
    Pending,
    /// Delivered.
    Fired,
    /// Cancelled before delivery.
    Cancelled,
    /// The scheduler does not know the handle.
    Unknown,
}

/// "Call me back at time T, cancel by handle" service.
///
/// The workflow coordinator owns the decision of when to fire; the
/// scheduler only guarantees eventual delivery of the callback to
/// `ReminderCoordinator::fire` with the same handle it returned.
/// Failures are reported as `ErrorKind::ExternalService`.
#[async_trait]
pub trait ReminderScheduler: Send + Sync + 'static {
    /// Register a callback for `subscription_id` at `fire_at`.
    async fn schedule(
        &self,
        subscription_id: SubscriptionId,
        fire_at: DateTime<Utc>,
    ) -> AppResult<WorkflowHandle>;

    /// Cancel a callback. Cancelling an unknown or already fired handle is not an error.
    async fn cancel(&self, handle: &WorkflowHandle) -> AppResult<()>;

    /// Report the scheduler's view of a callback.
    async fn status(&self, handle: &WorkflowHandle) -> AppResult<ScheduledCallbackStatus>;
}
