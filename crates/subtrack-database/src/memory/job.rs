//! In-memory job queue store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use subtrack_core::result::AppResult;
use subtrack_core::types::id::JobId;
use subtrack_entity::job::{CreateJob, Job, JobStatus};

use crate::store::JobStore;

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    rows: DashMap<JobId, Job>,
    /// Serializes claims so two workers never take the same job.
    claim_lock: Mutex<()>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, data: CreateJob) -> AppResult<Job> {
        let job = data.into_job(Utc::now());
        self.rows.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        Ok(self.rows.get(&id).map(|j| j.clone()))
    }

    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Job>> {
        let _guard = self.claim_lock.lock().await;
        let next = self
            .rows
            .iter()
            .filter(|j| j.queue == queue && j.is_due(now))
            .max_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(b.created_at.cmp(&a.created_at))
            })
            .map(|j| j.id);

        let Some(id) = next else {
            return Ok(None);
        };
        let Some(mut job) = self.rows.get_mut(&id) else {
            return Ok(None);
        };
        job.status = JobStatus::Running;
        job.started_at = Some(now);
        job.worker_id = Some(worker_id.to_string());
        job.attempts += 1;
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn mark_completed(&self, id: JobId, result: Option<serde_json::Value>) -> AppResult<()> {
        if let Some(mut job) = self.rows.get_mut(&id) {
            let now = Utc::now();
            job.status = JobStatus::Completed;
            job.result = result;
            job.completed_at = Some(now);
            job.updated_at = now;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: JobId, error: &str) -> AppResult<()> {
        if let Some(mut job) = self.rows.get_mut(&id) {
            let now = Utc::now();
            job.status = JobStatus::Failed;
            job.error_message = Some(error.to_string());
            job.completed_at = Some(now);
            job.updated_at = now;
        }
        Ok(())
    }

    async fn retry(&self, id: JobId, run_at: DateTime<Utc>) -> AppResult<()> {
        if let Some(mut job) = self.rows.get_mut(&id) {
            if job.status == JobStatus::Running {
                job.status = JobStatus::Pending;
                job.scheduled_at = Some(run_at);
                job.started_at = None;
                job.worker_id = None;
                job.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn cancel(&self, id: JobId) -> AppResult<bool> {
        let Some(mut job) = self.rows.get_mut(&id) else {
            return Ok(false);
        };
        if job.status != JobStatus::Pending {
            return Ok(false);
        }
        job.status = JobStatus::Cancelled;
        job.updated_at = Utc::now();
        Ok(true)
    }

    async fn cleanup_finished(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let before_len = self.rows.len();
        self.rows
            .retain(|_, j| !(j.status.is_terminal() && j.updated_at < before));
        Ok((before_len - self.rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use subtrack_entity::job::JobPriority;

    fn create(scheduled_at: Option<DateTime<Utc>>) -> CreateJob {
        CreateJob {
            job_type: "reminder_callback".to_string(),
            queue: "reminders".to_string(),
            priority: JobPriority::Normal,
            payload: serde_json::json!({}),
            max_attempts: 3,
            scheduled_at,
        }
    }

    #[tokio::test]
    async fn test_future_job_is_not_claimed() {
        let store = MemoryJobStore::new();
        let now = Utc::now();
        store.create(create(Some(now + Duration::hours(1)))).await.unwrap();

        assert!(store.claim_next("reminders", "w1", now).await.unwrap().is_none());
        let claimed = store
            .claim_next("reminders", "w1", now + Duration::hours(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.status, JobStatus::Running);
        assert_eq!(claimed.attempts, 1);
    }

    #[tokio::test]
    async fn test_cancel_only_pending() {
        let store = MemoryJobStore::new();
        let job = store.create(create(None)).await.unwrap();
        assert!(store.cancel(job.id).await.unwrap());
        assert!(!store.cancel(job.id).await.unwrap());
        assert!(store.claim_next("reminders", "w1", Utc::now()).await.unwrap().is_none());
    }
}
