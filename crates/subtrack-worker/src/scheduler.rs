//! Cron scheduler enqueuing the periodic sweeps.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use subtrack_core::config::worker::WorkerConfig;
use subtrack_core::error::AppError;
use subtrack_entity::job::{JobPayload, JobPriority};

use crate::queue::{JobQueue, MAINTENANCE_QUEUE};

/// Cron-based scheduler for periodic background tasks
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Job queue for enqueuing scheduled work
    queue: Arc<JobQueue>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(queue: Arc<JobQueue>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, queue })
    }

    /// Register the overdue sweep, reminder sweep, notification cleanup and
    /// job cleanup using the configured cron expressions.
    pub async fn register_default_tasks(&self, config: &WorkerConfig) -> Result<(), AppError> {
        self.register(&config.overdue_sweep_cron, JobPayload::OverdueSweep, JobPriority::High)
            .await?;
        self.register(&config.reminder_sweep_cron, JobPayload::ReminderSweep, JobPriority::Normal)
            .await?;
        self.register(
            &config.notification_cleanup_cron,
            JobPayload::NotificationCleanup,
            JobPriority::Low,
        )
        .await?;
        self.register(&config.job_cleanup_cron, JobPayload::JobCleanup, JobPriority::Low)
            .await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Enqueue `payload` on the maintenance queue on every tick of `cron`.
    async fn register(
        &self,
        cron: &str,
        payload: JobPayload,
        priority: JobPriority,
    ) -> Result<(), AppError> {
        let job_type = payload.job_type();
        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async(cron, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            let payload = payload.clone();
            Box::pin(async move {
                tracing::debug!(job_type = payload.job_type(), "Scheduling periodic job");
                if let Err(e) = queue
                    .enqueue_payload(&payload, MAINTENANCE_QUEUE, priority, None)
                    .await
                {
                    tracing::error!(job_type = payload.job_type(), error = %e, "Failed to enqueue periodic job");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid cron '{cron}' for {job_type}: {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {job_type} schedule: {e}")))?;

        tracing::info!(job_type, cron, "Registered periodic job");
        Ok(())
    }
}
