//! Worker runner: polls the queue and executes due jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time;
use tracing;

use subtrack_core::config::worker::WorkerConfig;
use subtrack_core::error::AppError;
use subtrack_entity::job::Job;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::{JobQueue, MAINTENANCE_QUEUE, REMINDER_QUEUE};

/// Base delay before a transiently failed job runs again.
const RETRY_BASE_SECONDS: i64 = 30;

/// Main worker runner that polls queues and executes jobs
#[derive(Debug)]
pub struct WorkerRunner {
    /// Job queue for polling
    queue: Arc<JobQueue>,
    /// Job executor for dispatching
    executor: Arc<JobExecutor>,
    /// Worker configuration
    config: WorkerConfig,
    /// Queues to poll (in priority order)
    queues: Vec<String>,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
            queues: vec![REMINDER_QUEUE.to_string(), MAINTENANCE_QUEUE.to_string()],
        }
    }

    /// Run until the cancel signal is received.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let worker_id = self.queue.worker_id().to_string();
        tracing::info!(
            worker_id = %worker_id,
            concurrency = self.config.concurrency,
            poll_interval_seconds = self.config.poll_interval_seconds,
            queues = ?self.queues,
            "Worker started"
        );

        let concurrency = self.config.concurrency.max(1);
        let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        tracing::info!(worker_id = %worker_id, "Worker received shutdown signal");
                        break;
                    }
                }
                found = self.poll_and_spawn(&semaphore) => {
                    if found {
                        continue;
                    }
                    tokio::select! {
                        _ = cancel.changed() => {
                            if *cancel.borrow() {
                                tracing::info!(worker_id = %worker_id, "Worker shutting down");
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        tracing::info!(worker_id = %worker_id, "Waiting for in-flight jobs to complete");

        let _ = tokio::time::timeout(
            Duration::from_secs(30),
            semaphore.acquire_many(concurrency as u32),
        )
        .await;

        tracing::info!(worker_id = %worker_id, "Worker shut down complete");
    }

    /// Claim and execute due jobs inline until none is left. Returns the
    /// number of jobs processed.
    pub async fn drain(&self) -> Result<usize, AppError> {
        let mut processed = 0;
        while let Some(job) = self.dequeue().await? {
            process(&self.queue, &self.executor, job).await;
            processed += 1;
        }
        Ok(processed)
    }

    async fn dequeue(&self) -> Result<Option<Job>, AppError> {
        let queue_refs: Vec<&str> = self.queues.iter().map(|s| s.as_str()).collect();
        self.queue.dequeue(&queue_refs, Utc::now()).await
    }

    /// Poll for a job and spawn it if available. Returns whether a job was claimed.
    async fn poll_and_spawn(&self, semaphore: &Arc<tokio::sync::Semaphore>) -> bool {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::trace!("All worker slots occupied, waiting...");
                return false;
            }
        };

        match self.dequeue().await {
            Ok(Some(job)) => {
                let queue = Arc::clone(&self.queue);
                let executor = Arc::clone(&self.executor);
                tokio::spawn(async move {
                    let _permit = permit;
                    process(&queue, &executor, job).await;
                });
                true
            }
            Ok(None) => {
                tracing::trace!("No jobs available in queues");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to dequeue job");
                false
            }
        }
    }
}

/// Execute one claimed job and record the outcome.
async fn process(queue: &JobQueue, executor: &JobExecutor, job: Job) {
    let job_id = job.id;
    tracing::info!(
        job_id = %job_id,
        job_type = %job.job_type,
        attempt = job.attempts,
        max_attempts = job.max_attempts,
        "Processing job"
    );

    match executor.execute(&job).await {
        Ok(result) => {
            if let Err(e) = queue.complete(job_id, result).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark job as completed");
            }
            tracing::info!(job_id = %job_id, "Job completed successfully");
        }
        Err(JobExecutionError::Transient(msg)) => {
            tracing::warn!(job_id = %job_id, error = %msg, "Job failed (transient)");
            if job.can_retry() {
                let delay = RETRY_BASE_SECONDS * 2i64.pow(job.attempts.max(1) as u32 - 1);
                let run_at = Utc::now() + chrono::Duration::seconds(delay);
                if let Err(e) = queue.retry(job_id, run_at).await {
                    tracing::error!(job_id = %job_id, error = %e, "Failed to retry job");
                }
            } else if let Err(e) = queue.fail(job_id, &msg).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark job as failed");
            }
        }
        Err(JobExecutionError::Permanent(msg)) => {
            tracing::error!(job_id = %job_id, error = %msg, "Job failed permanently");
            if let Err(e) = queue.fail(job_id, &msg).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark job as failed");
            }
        }
        Err(JobExecutionError::Internal(err)) => {
            let msg = err.to_string();
            tracing::error!(job_id = %job_id, error = %msg, "Job internal error");
            if let Err(e) = queue.fail(job_id, &msg).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark job as failed");
            }
        }
    }
}
