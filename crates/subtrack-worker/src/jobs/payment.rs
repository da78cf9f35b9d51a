//! Overdue payment sweep job.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing;

use subtrack_entity::job::Job;
use subtrack_service::PaymentTracker;

use crate::executor::{JobExecutionError, JobHandler};

/// Moves past-due pending payments to overdue.
#[derive(Debug)]
pub struct OverdueSweepHandler {
    tracker: Arc<PaymentTracker>,
}

impl OverdueSweepHandler {
    pub fn new(tracker: Arc<PaymentTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl JobHandler for OverdueSweepHandler {
    fn job_type(&self) -> &str {
        "overdue_sweep"
    }

    async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let moved = self
            .tracker
            .sweep_overdue(Utc::now())
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Overdue sweep failed: {e}")))?;

        tracing::info!(moved, "Overdue sweep complete");
        Ok(Some(serde_json::json!({
            "task": "overdue_sweep",
            "moved_to_overdue": moved,
        })))
    }
}
