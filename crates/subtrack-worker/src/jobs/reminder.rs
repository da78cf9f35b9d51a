//! Reminder callback and reminder sweep jobs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing;

use subtrack_entity::job::{Job, JobPayload};
use subtrack_service::ReminderCoordinator;
use subtrack_service::reminder::FireOutcome;

use crate::callback::handle_for;
use crate::executor::{JobExecutionError, JobHandler, decode_payload};

/// Delivers a delayed callback to the coordinator.
#[derive(Debug)]
pub struct ReminderCallbackHandler {
    coordinator: Arc<ReminderCoordinator>,
}

impl ReminderCallbackHandler {
    pub fn new(coordinator: Arc<ReminderCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl JobHandler for ReminderCallbackHandler {
    fn job_type(&self) -> &str {
        "reminder_callback"
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let JobPayload::ReminderCallback { subscription_id } = decode_payload(job)? else {
            return Err(JobExecutionError::Permanent(format!(
                "Job {} is not a reminder callback",
                job.id
            )));
        };

        let outcome = self
            .coordinator
            .fire(subscription_id, &handle_for(job.id), Utc::now())
            .await
            .map_err(|e| JobExecutionError::from_service("Reminder callback", e))?;

        let (result, created) = match &outcome {
            FireOutcome::Evaluated(evaluation) => ("evaluated", evaluation.created_count()),
            FireOutcome::Stale => ("stale", 0),
            FireOutcome::Inactive => ("inactive", 0),
            FireOutcome::Missing => ("missing", 0),
        };
        tracing::info!(
            job_id = %job.id,
            subscription_id = %subscription_id,
            result,
            notifications_created = created,
            "Reminder callback handled"
        );

        Ok(Some(serde_json::json!({
            "subscription_id": subscription_id,
            "result": result,
            "notifications_created": created,
        })))
    }
}

/// Daily safety net in case callbacks are lost.
#[derive(Debug)]
pub struct ReminderSweepHandler {
    coordinator: Arc<ReminderCoordinator>,
}

impl ReminderSweepHandler {
    pub fn new(coordinator: Arc<ReminderCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl JobHandler for ReminderSweepHandler {
    fn job_type(&self) -> &str {
        "reminder_sweep"
    }

    async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let report = self
            .coordinator
            .sweep(Utc::now())
            .await
            .map_err(|e| JobExecutionError::from_service("Reminder sweep", e))?;
        Ok(Some(serde_json::to_value(report).map_err(|e| {
            JobExecutionError::Permanent(format!("Unserializable sweep report: {e}"))
        })?))
    }
}
