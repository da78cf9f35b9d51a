//! Reminder workflow configuration.

use serde::{Deserialize, Serialize};

/// Offsets and retry policy for renewal reminders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Days before renewal at which a renewal reminder fires.
    #[serde(default = "default_renewal_offsets")]
    pub renewal_offsets_days: Vec<i64>,
    /// Days before trial end at which a trial-ending reminder fires.
    #[serde(default = "default_trial_offsets")]
    pub trial_offsets_days: Vec<i64>,
    /// Attempts per scheduler call before giving up.
    #[serde(default = "default_max_attempts")]
    pub scheduler_max_attempts: u32,
    /// Base delay for exponential backoff between scheduler attempts.
    #[serde(default = "default_backoff_ms")]
    pub scheduler_backoff_ms: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            renewal_offsets_days: default_renewal_offsets(),
            trial_offsets_days: default_trial_offsets(),
            scheduler_max_attempts: default_max_attempts(),
            scheduler_backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_renewal_offsets() -> Vec<i64> {
    vec![7, 3, 1, 0]
}

fn default_trial_offsets() -> Vec<i64> {
    vec![3, 1]
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    200
}
