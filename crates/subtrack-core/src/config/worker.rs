//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent job processing tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between job queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Cron expression for the overdue payment sweep.
    #[serde(default = "default_overdue_cron")]
    pub overdue_sweep_cron: String,
    /// Cron expression for the reminder safety-net sweep.
    #[serde(default = "default_reminder_cron")]
    pub reminder_sweep_cron: String,
    /// Cron expression for the notification retention cleanup.
    #[serde(default = "default_cleanup_cron")]
    pub notification_cleanup_cron: String,
    /// Cron expression for purging finished jobs.
    #[serde(default = "default_job_cleanup_cron")]
    pub job_cleanup_cron: String,
    /// Finished jobs older than this many days are purged.
    #[serde(default = "default_job_retention")]
    pub job_retention_days: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            overdue_sweep_cron: default_overdue_cron(),
            reminder_sweep_cron: default_reminder_cron(),
            notification_cleanup_cron: default_cleanup_cron(),
            job_cleanup_cron: default_job_cleanup_cron(),
            job_retention_days: default_job_retention(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    5
}

fn default_overdue_cron() -> String {
    "0 0 * * * *".to_string()
}

fn default_reminder_cron() -> String {
    "0 15 0 * * *".to_string()
}

fn default_cleanup_cron() -> String {
    "0 30 3 * * *".to_string()
}

fn default_job_cleanup_cron() -> String {
    "0 45 3 * * *".to_string()
}

fn default_job_retention() -> i64 {
    7
}
