//! Request context carrying the calling user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use subtrack_core::types::id::UserId;

/// Context for the current request.
///
/// Identity is established by the upstream gateway; the engine only
/// receives the resolved user id and the admin flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The calling user's ID.
    pub user_id: UserId,
    /// Whether the caller may use administrative operations.
    pub is_admin: bool,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context stamped with the current time.
    pub fn new(user_id: UserId, is_admin: bool) -> Self {
        Self {
            user_id,
            is_admin,
            request_time: Utc::now(),
        }
    }
}
