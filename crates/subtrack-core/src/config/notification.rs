//! Notification generation and retention configuration.

use serde::{Deserialize, Serialize};

/// Settings consumed by the notification generator and cleanup sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Trailing window in hours within which an identical notification is not recreated.
    #[serde(default = "default_dedup_window")]
    pub dedup_window_hours: i64,
    /// Read notifications older than this many days are removed by cleanup.
    #[serde(default = "default_retention")]
    pub retention_days: i64,
    /// Days after creation at which a notification expires.
    #[serde(default = "default_expiry")]
    pub expiry_days: i64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            dedup_window_hours: default_dedup_window(),
            retention_days: default_retention(),
            expiry_days: default_expiry(),
        }
    }
}

fn default_dedup_window() -> i64 {
    24
}

fn default_retention() -> i64 {
    30
}

fn default_expiry() -> i64 {
    30
}
