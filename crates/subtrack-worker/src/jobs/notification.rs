//! Notification retention cleanup job.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing;

use subtrack_entity::job::Job;
use subtrack_service::NotificationGenerator;

use crate::executor::{JobExecutionError, JobHandler};

/// Deletes read notifications past the retention period.
#[derive(Debug)]
pub struct NotificationCleanupHandler {
    generator: Arc<NotificationGenerator>,
}

impl NotificationCleanupHandler {
    pub fn new(generator: Arc<NotificationGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl JobHandler for NotificationCleanupHandler {
    fn job_type(&self) -> &str {
        "notification_cleanup"
    }

    async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let removed = self.generator.cleanup(Utc::now()).await.map_err(|e| {
            JobExecutionError::Transient(format!("Notification cleanup failed: {e}"))
        })?;

        tracing::info!(removed, "Notification cleanup complete");
        Ok(Some(serde_json::json!({
            "task": "notification_cleanup",
            "removed": removed,
        })))
    }
}
