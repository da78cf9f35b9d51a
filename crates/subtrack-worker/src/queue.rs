//! Job queue abstraction for enqueuing and dequeuing background jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing;

use subtrack_core::error::AppError;
use subtrack_core::types::id::JobId;
use subtrack_database::JobStore;
use subtrack_entity::job::{CreateJob, Job, JobPayload, JobPriority};

/// Queue for delayed reminder callbacks.
pub const REMINDER_QUEUE: &str = "reminders";
/// Queue for periodic sweeps and cleanup.
pub const MAINTENANCE_QUEUE: &str = "maintenance";

/// Job queue for enqueuing and dequeuing work
#[derive(Clone)]
pub struct JobQueue {
    /// Job store for persistence
    store: Arc<dyn JobStore>,
    /// Worker identifier for claiming jobs
    worker_id: String,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("worker_id", &self.worker_id)
            .finish_non_exhaustive()
    }
}

impl JobQueue {
    /// Create a new job queue
    pub fn new(store: Arc<dyn JobStore>, worker_id: impl Into<String>) -> Self {
        Self {
            store,
            worker_id: worker_id.into(),
        }
    }

    /// Worker identifier used when claiming jobs.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Enqueue a new job
    pub async fn enqueue(&self, params: CreateJob) -> Result<Job, AppError> {
        let job = self.store.create(params).await?;

        tracing::debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            queue = %job.queue,
            priority = ?job.priority,
            scheduled_at = ?job.scheduled_at,
            "Enqueued job"
        );

        Ok(job)
    }

    /// Enqueue a typed payload.
    pub async fn enqueue_payload(
        &self,
        payload: &JobPayload,
        queue: &str,
        priority: JobPriority,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<Job, AppError> {
        let params = CreateJob::from_payload(payload, queue, priority, scheduled_at)?;
        self.enqueue(params).await
    }

    /// Dequeue the next due job from the given queues, in order
    pub async fn dequeue(&self, queues: &[&str], now: DateTime<Utc>) -> Result<Option<Job>, AppError> {
        for queue in queues {
            if let Some(job) = self.store.claim_next(queue, &self.worker_id, now).await? {
                tracing::debug!(
                    job_id = %job.id,
                    job_type = %job.job_type,
                    queue = %job.queue,
                    "Dequeued job"
                );
                return Ok(Some(job));
            }
        }

        Ok(None)
    }

    /// Look up a job.
    pub async fn get(&self, job_id: JobId) -> Result<Option<Job>, AppError> {
        self.store.find_by_id(job_id).await
    }

    /// Mark a job as completed successfully
    pub async fn complete(
        &self,
        job_id: JobId,
        result: Option<serde_json::Value>,
    ) -> Result<(), AppError> {
        self.store.mark_completed(job_id, result).await?;
        tracing::debug!(job_id = %job_id, "Job completed");
        Ok(())
    }

    /// Mark a job as failed
    pub async fn fail(&self, job_id: JobId, error: &str) -> Result<(), AppError> {
        self.store.mark_failed(job_id, error).await?;
        tracing::debug!(job_id = %job_id, error, "Job failed");
        Ok(())
    }

    /// Cancel a pending job. `false` when it already ran or does not exist.
    pub async fn cancel(&self, job_id: JobId) -> Result<bool, AppError> {
        let cancelled = self.store.cancel(job_id).await?;
        tracing::debug!(job_id = %job_id, cancelled, "Job cancel requested");
        Ok(cancelled)
    }

    /// Put a job back to pending, runnable from `run_at`
    pub async fn retry(&self, job_id: JobId, run_at: DateTime<Utc>) -> Result<(), AppError> {
        self.store.retry(job_id, run_at).await?;
        tracing::debug!(job_id = %job_id, run_at = %run_at, "Job scheduled for retry");
        Ok(())
    }

    /// Delete finished jobs last touched before `before`.
    pub async fn cleanup(&self, before: DateTime<Utc>) -> Result<u64, AppError> {
        self.store.cleanup_finished(before).await
    }
}
