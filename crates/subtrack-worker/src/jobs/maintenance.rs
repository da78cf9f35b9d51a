//! Finished job purge.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use tracing;

use subtrack_entity::job::Job;

use crate::executor::{JobExecutionError, JobHandler};
use crate::queue::JobQueue;

/// Deletes completed, failed and cancelled jobs older than the retention.
#[derive(Debug)]
pub struct JobCleanupHandler {
    queue: Arc<JobQueue>,
    retention_days: i64,
}

impl JobCleanupHandler {
    pub fn new(queue: Arc<JobQueue>, retention_days: i64) -> Self {
        Self {
            queue,
            retention_days,
        }
    }
}

#[async_trait]
impl JobHandler for JobCleanupHandler {
    fn job_type(&self) -> &str {
        "job_cleanup"
    }

    async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let cutoff = Utc::now() - Duration::days(self.retention_days);
        let removed = self
            .queue
            .cleanup(cutoff)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Job cleanup failed: {e}")))?;

        tracing::info!(removed, retention_days = self.retention_days, "Job cleanup complete");
        Ok(Some(serde_json::json!({
            "task": "job_cleanup",
            "removed": removed,
        })))
    }
}
