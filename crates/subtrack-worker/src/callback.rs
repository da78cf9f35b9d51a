//! Reminder scheduler backed by delayed jobs in the job queue.
//!
//! A callback is a `reminder_callback` job with `scheduled_at` set to the
//! fire time; its job id is the workflow handle.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use subtrack_core::error::{AppError, ErrorKind};
use subtrack_core::result::AppResult;
use subtrack_core::traits::scheduler::{ReminderScheduler, ScheduledCallbackStatus};
use subtrack_core::types::id::{JobId, SubscriptionId, WorkflowHandle};
use subtrack_entity::job::{JobPayload, JobPriority, JobStatus};

use crate::queue::{JobQueue, REMINDER_QUEUE};

/// [`ReminderScheduler`] that persists callbacks as delayed jobs.
#[derive(Debug, Clone)]
pub struct JobQueueScheduler {
    queue: Arc<JobQueue>,
}

impl JobQueueScheduler {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self { queue }
    }
}

/// Job id carried by a handle this scheduler issued.
pub fn job_id_of(handle: &WorkflowHandle) -> Option<JobId> {
    handle.as_str().parse().ok()
}

/// Handle for a callback job.
pub fn handle_for(job_id: JobId) -> WorkflowHandle {
    WorkflowHandle::new(job_id.to_string())
}

/// Storage failures reach the coordinator as scheduler failures.
fn external(err: AppError) -> AppError {
    if err.kind == ErrorKind::ExternalService {
        err
    } else {
        let message = format!("Callback queue unavailable: {}", err.message);
        AppError::with_source(ErrorKind::ExternalService, message, err)
    }
}

#[async_trait]
impl ReminderScheduler for JobQueueScheduler {
    async fn schedule(
        &self,
        subscription_id: SubscriptionId,
        fire_at: DateTime<Utc>,
    ) -> AppResult<WorkflowHandle> {
        let job = self
            .queue
            .enqueue_payload(
                &JobPayload::ReminderCallback { subscription_id },
                REMINDER_QUEUE,
                JobPriority::High,
                Some(fire_at),
            )
            .await
            .map_err(external)?;
        tracing::debug!(
            subscription_id = %subscription_id,
            job_id = %job.id,
            fire_at = %fire_at,
            "Reminder callback scheduled"
        );
        Ok(handle_for(job.id))
    }

    async fn cancel(&self, handle: &WorkflowHandle) -> AppResult<()> {
        let Some(job_id) = job_id_of(handle) else {
            return Ok(());
        };
        self.queue.cancel(job_id).await.map_err(external)?;
        Ok(())
    }

    async fn status(&self, handle: &WorkflowHandle) -> AppResult<ScheduledCallbackStatus> {
        let Some(job_id) = job_id_of(handle) else {
            return Ok(ScheduledCallbackStatus::Unknown);
        };
        let job = self.queue.get(job_id).await.map_err(external)?;
        Ok(match job.map(|j| j.status) {
            Some(JobStatus::Pending) => ScheduledCallbackStatus::Pending,
            Some(JobStatus::Running | JobStatus::Completed | JobStatus::Failed) => {
                ScheduledCallbackStatus::Fired
            }
            Some(JobStatus::Cancelled) => ScheduledCallbackStatus::Cancelled,
            None => ScheduledCallbackStatus::Unknown,
        })
    }
}
